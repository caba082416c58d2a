use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppResult, ErrorBody},
    models::DashboardStats,
};

/// get_admin_stats
///
/// [Admin Route] Headline counters for the dashboard landing page.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = DashboardStats),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    ),
    tag = "dashboard"
)]
pub async fn get_admin_stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardStats>> {
    auth.require_admin()?;
    Ok(Json(state.repo.get_stats().await?))
}
