use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{CompanyTreasury, TreasuryBalance},
    repository::TreasuryFilter,
};

/// get_treasury_balance
///
/// [Admin Route] Sum of every ledger movement, recomputed on each call.
#[utoipa::path(
    get,
    path = "/admin/treasury/balance",
    responses(
        (status = 200, description = "Balance", body = TreasuryBalance),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    ),
    tag = "treasury"
)]
pub async fn get_treasury_balance(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<TreasuryBalance>> {
    auth.require_admin()?;
    Ok(Json(state.repo.treasury_balance().await?))
}

#[utoipa::path(
    get,
    path = "/admin/treasury/entries",
    params(TreasuryFilter),
    responses(
        (status = 200, description = "Ledger, newest first", body = [CompanyTreasury]),
        (status = 400, description = "Invalid date range", body = ErrorBody)
    ),
    tag = "treasury"
)]
pub async fn get_treasury_entries(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<TreasuryFilter>,
) -> AppResult<Json<Vec<CompanyTreasury>>> {
    auth.require_admin()?;
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if to < from {
            return Err(AppError::bad_request("Invalid date range"));
        }
    }
    Ok(Json(state.repo.list_treasury_entries(&filter).await?))
}
