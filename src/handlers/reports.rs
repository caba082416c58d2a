use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppResult, ErrorBody},
    models::{
        CancellationReport, DateRange, OrderStateReport, RevenueReport, UtilizationQuery,
        VehicleUtilizationReport,
    },
    reports,
    repository::{FeeFilter, OrderFilter, ReservationFilter, TreasuryFilter, VehicleFilter},
};

fn orders_created_in(range: &DateRange) -> OrderFilter {
    OrderFilter {
        created_from: Some(range.from),
        created_to: Some(range.to),
        ..Default::default()
    }
}

/// get_revenue_report
///
/// [Admin Route] Payments, refunds and cancellation fees booked in the window, with a
/// month-by-month net.
#[utoipa::path(
    get,
    path = "/admin/reports/revenue",
    params(DateRange),
    responses(
        (status = 200, description = "Revenue", body = RevenueReport),
        (status = 400, description = "Invalid date range", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    ),
    tag = "reports"
)]
pub async fn get_revenue_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> AppResult<Json<RevenueReport>> {
    auth.require_admin()?;
    range.validate()?;
    let entries = state
        .repo
        .list_treasury_entries(&TreasuryFilter {
            from: Some(range.from),
            to: Some(range.to),
        })
        .await?;
    Ok(Json(reports::revenue(&range, &entries)))
}

#[utoipa::path(
    get,
    path = "/admin/reports/cancellations",
    params(DateRange),
    responses(
        (status = 200, description = "Cancellations", body = CancellationReport),
        (status = 400, description = "Invalid date range", body = ErrorBody)
    ),
    tag = "reports"
)]
pub async fn get_cancellation_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> AppResult<Json<CancellationReport>> {
    auth.require_admin()?;
    range.validate()?;
    let orders = state.repo.list_orders(&orders_created_in(&range)).await?;
    let fees = state
        .repo
        .list_cancellation_fees(&FeeFilter::default())
        .await?;
    Ok(Json(reports::cancellations(&range, &orders, &fees)))
}

/// get_vehicle_utilization_report
///
/// [Admin Route] Share of the window each vehicle spent reserved, busiest first.
#[utoipa::path(
    get,
    path = "/admin/reports/vehicles",
    params(UtilizationQuery),
    responses(
        (status = 200, description = "Utilization", body = VehicleUtilizationReport),
        (status = 400, description = "Invalid date range", body = ErrorBody)
    ),
    tag = "reports"
)]
pub async fn get_vehicle_utilization_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UtilizationQuery>,
) -> AppResult<Json<VehicleUtilizationReport>> {
    auth.require_admin()?;
    let range = DateRange::new(query.from, query.to)?;

    let vehicles = state
        .repo
        .list_vehicles(&VehicleFilter {
            sub_category_id: query.sub_category_id,
            ..Default::default()
        })
        .await?;
    let rows = state
        .repo
        .reserved_days(&ReservationFilter {
            vehicle_id: None,
            sub_category_id: query.sub_category_id,
            from: range.from,
            to: range.to,
        })
        .await?;
    Ok(Json(reports::utilization(&range, &vehicles, &rows)))
}

#[utoipa::path(
    get,
    path = "/admin/reports/order-states",
    params(DateRange),
    responses(
        (status = 200, description = "Orders per state", body = OrderStateReport),
        (status = 400, description = "Invalid date range", body = ErrorBody)
    ),
    tag = "reports"
)]
pub async fn get_order_state_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> AppResult<Json<OrderStateReport>> {
    auth.require_admin()?;
    range.validate()?;
    let orders = state.repo.list_orders(&orders_created_in(&range)).await?;
    Ok(Json(reports::order_states(&range, &orders)))
}
