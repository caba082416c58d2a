use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppResult, ErrorBody},
    models::OrderCancellationFee,
    repository::FeeFilter,
};

use super::{applied, found};

const NOT_FOUND: &str = "Cancellation fee not found";
const ALREADY_SETTLED: &str = "Cancellation fee is already settled";

#[utoipa::path(
    get,
    path = "/cancellation-fees",
    params(FeeFilter),
    responses((status = 200, description = "Fees, newest first", body = [OrderCancellationFee])),
    tag = "fees"
)]
pub async fn get_cancellation_fees(
    State(state): State<AppState>,
    Query(filter): Query<FeeFilter>,
) -> AppResult<Json<Vec<OrderCancellationFee>>> {
    Ok(Json(state.repo.list_cancellation_fees(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/cancellation-fees/{id}",
    params(("id" = Uuid, Path, description = "Cancellation fee ID")),
    responses(
        (status = 200, description = "Found", body = OrderCancellationFee),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "fees"
)]
pub async fn get_cancellation_fee_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderCancellationFee>> {
    Ok(Json(found(
        state.repo.get_cancellation_fee(id).await?,
        NOT_FOUND,
    )?))
}

/// pay_cancellation_fee
///
/// Unpaid → Paid, crediting the treasury.
#[utoipa::path(
    post,
    path = "/cancellation-fees/{id}/pay",
    params(("id" = Uuid, Path, description = "Cancellation fee ID")),
    responses(
        (status = 200, description = "Paid", body = OrderCancellationFee),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Already settled", body = ErrorBody)
    ),
    tag = "fees"
)]
pub async fn pay_cancellation_fee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderCancellationFee>> {
    let mut fee = found(state.repo.get_cancellation_fee(id).await?, NOT_FOUND)?;
    let credit = fee.pay()?;
    applied(
        state.repo.settle_cancellation_fee(&fee, Some(&credit)).await?,
        ALREADY_SETTLED,
    )?;
    tracing::info!(fee_id = %fee.id, amount = %fee.amount, "Cancellation fee paid");
    Ok(Json(fee))
}

/// waive_cancellation_fee
///
/// Unpaid → Waived. No money moves.
#[utoipa::path(
    post,
    path = "/cancellation-fees/{id}/waive",
    params(("id" = Uuid, Path, description = "Cancellation fee ID")),
    responses(
        (status = 200, description = "Waived", body = OrderCancellationFee),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Already settled", body = ErrorBody)
    ),
    tag = "fees"
)]
pub async fn waive_cancellation_fee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderCancellationFee>> {
    let mut fee = found(state.repo.get_cancellation_fee(id).await?, NOT_FOUND)?;
    fee.waive()?;
    applied(
        state.repo.settle_cancellation_fee(&fee, None).await?,
        ALREADY_SETTLED,
    )?;
    tracing::info!(fee_id = %fee.id, "Cancellation fee waived");
    Ok(Json(fee))
}
