use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. Each handler takes an `AuthUser` and calls
/// `require_admin`, so a missing token answers 401 and an employee token answers 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Headline counters for the dashboard landing page.
        .route("/stats", get(handlers::get_admin_stats))
        // --- Staff accounts ---
        .route(
            "/users",
            get(handlers::get_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user_by_id).delete(handlers::delete_user),
        )
        // --- Treasury ---
        .route("/treasury/balance", get(handlers::get_treasury_balance))
        .route("/treasury/entries", get(handlers::get_treasury_entries))
        // --- Reports ---
        .route("/reports/revenue", get(handlers::get_revenue_report))
        .route(
            "/reports/cancellations",
            get(handlers::get_cancellation_report),
        )
        .route(
            "/reports/vehicles",
            get(handlers::get_vehicle_utilization_report),
        )
        .route(
            "/reports/order-states",
            get(handlers::get_order_state_report),
        )
}
