use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    error::{AppResult, ErrorBody},
    models::{DateRange, ReservationQuery, VehicleBookedDays, booked_days},
    repository::{ReservationFilter, VehicleFilter},
};

use super::found;

/// get_reserved_vehicles
///
/// For every vehicle of a sub-category, the calendar days inside `[from, to]` on
/// which it is booked. Vehicles without bookings are listed with an empty set, so the
/// dashboard can draw the full availability grid from one call.
#[utoipa::path(
    get,
    path = "/reservations",
    params(ReservationQuery),
    responses(
        (status = 200, description = "Booked days per vehicle", body = [VehicleBookedDays]),
        (status = 400, description = "Invalid date range", body = ErrorBody),
        (status = 404, description = "Unknown sub-category", body = ErrorBody)
    ),
    tag = "reservations"
)]
pub async fn get_reserved_vehicles(
    State(state): State<AppState>,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<Vec<VehicleBookedDays>>> {
    let range = DateRange::new(query.from, query.to)?;
    found(
        state.repo.get_sub_category(query.sub_category_id).await?,
        "Sub-category not found",
    )?;

    let vehicles = state
        .repo
        .list_vehicles(&VehicleFilter {
            sub_category_id: Some(query.sub_category_id),
            ..Default::default()
        })
        .await?;
    let rows = state
        .repo
        .reserved_days(&ReservationFilter {
            vehicle_id: None,
            sub_category_id: Some(query.sub_category_id),
            from: range.from,
            to: range.to,
        })
        .await?;

    let grid = vehicles
        .into_iter()
        .map(|vehicle| VehicleBookedDays {
            booked_days: booked_days(rows.iter().filter(|r| r.vehicle_id == vehicle.id), &range),
            vehicle_id: vehicle.id,
            plate_number: vehicle.plate_number,
        })
        .collect();

    Ok(Json(grid))
}
