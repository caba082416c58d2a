use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{CreateOrderRequest, CustomerState, Order, OrderDetails},
    repository::{OrderFilter, ReservationFilter},
};

use super::{applied, found};

const NOT_FOUND: &str = "Order not found";

/// create_order
///
/// Books a vehicle for an inclusive range of days.
///
/// *Checks*: the customer is `Active`, the vehicle is in service, the range is neither
/// inverted nor longer than a year and no day is already reserved. The daily rate is the sub-category price
/// at booking time. The order and one reservation row per day are written in a single
/// transaction; a racing booking of the same day is rejected by the database and
/// surfaces as the same 409.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Booked", body = Order),
        (status = 400, description = "Inverted or over-long date range", body = ErrorBody),
        (status = 404, description = "Unknown customer or vehicle", body = ErrorBody),
        (status = 409, description = "Days already reserved", body = ErrorBody),
        (status = 422, description = "Customer inactive or vehicle unavailable", body = ErrorBody)
    ),
    tag = "orders"
)]
pub async fn create_order(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    Order::check_range(payload.start_date, payload.end_date)?;

    let customer = found(
        state.repo.get_customer(payload.customer_id).await?,
        "Customer not found",
    )?;
    if customer.state != CustomerState::Active {
        return Err(AppError::invalid_state("Customer is not active"));
    }

    let vehicle = found(
        state.repo.get_vehicle(payload.vehicle_id).await?,
        "Vehicle not found",
    )?;
    if !vehicle.is_active {
        return Err(AppError::invalid_state("Vehicle is not available"));
    }

    let sub_category = found(
        state.repo.get_sub_category(vehicle.sub_category_id).await?,
        "Sub-category not found",
    )?;

    let taken = state
        .repo
        .reserved_days(&ReservationFilter {
            vehicle_id: Some(vehicle.id),
            sub_category_id: None,
            from: payload.start_date,
            to: payload.end_date,
        })
        .await?;
    if !taken.is_empty() {
        return Err(AppError::conflict(
            "Vehicle is already reserved for the selected dates",
        ));
    }

    let order = Order::new(
        customer.id,
        vehicle.id,
        payload.start_date,
        payload.end_date,
        sub_category.price_per_day,
        user_id,
    )?;
    state.repo.create_order(&order, &order.reservations()).await?;

    tracing::info!(
        order_id = %order.id,
        vehicle_id = %vehicle.id,
        days = order.rental_days(),
        total = %order.total_amount,
        "Order booked"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// get_order_by_id
///
/// Order with its payments, cancellation fee and running balance.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Found", body = OrderDetails),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "orders"
)]
pub async fn get_order_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderDetails>> {
    let order = found(state.repo.get_order(id).await?, NOT_FOUND)?;
    Ok(Json(order_details(&state, order).await?))
}

#[utoipa::path(
    get,
    path = "/orders",
    params(OrderFilter),
    responses((status = 200, description = "Orders, newest first", body = [Order])),
    tag = "orders"
)]
pub async fn get_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.repo.list_orders(&filter).await?))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/confirm",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Confirmed", body = Order),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Not pending", body = ErrorBody)
    ),
    tag = "orders"
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let mut order = found(state.repo.get_order(id).await?, NOT_FOUND)?;
    let from = order.state;
    order.confirm()?;
    applied(
        state.repo.update_order(&order, from).await?,
        "Only pending orders can be confirmed",
    )?;
    tracing::info!(order_id = %order.id, "Order confirmed");
    Ok(Json(order))
}

/// start_order
///
/// Vehicle picked up by the customer.
#[utoipa::path(
    post,
    path = "/orders/{id}/start",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "In progress", body = Order),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Not confirmed", body = ErrorBody)
    ),
    tag = "orders"
)]
pub async fn start_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let mut order = found(state.repo.get_order(id).await?, NOT_FOUND)?;
    let from = order.state;
    order.start()?;
    applied(
        state.repo.update_order(&order, from).await?,
        "Only confirmed orders can be started",
    )?;
    tracing::info!(order_id = %order.id, "Order started");
    Ok(Json(order))
}

/// complete_order
///
/// Vehicle returned. The reservation rows stay `Reserved` as rental history.
#[utoipa::path(
    post,
    path = "/orders/{id}/complete",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Completed", body = Order),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Not in progress", body = ErrorBody)
    ),
    tag = "orders"
)]
pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let mut order = found(state.repo.get_order(id).await?, NOT_FOUND)?;
    let from = order.state;
    order.complete()?;
    applied(
        state.repo.update_order(&order, from).await?,
        "Only orders in progress can be completed",
    )?;
    tracing::info!(order_id = %order.id, "Order completed");
    Ok(Json(order))
}

/// cancel_order
///
/// Cancels a pending or confirmed order and releases its days. Cancelling a confirmed
/// order raises an unpaid fee of the configured percentage of the total.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Cancelled", body = OrderDetails),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Already started, completed or cancelled", body = ErrorBody)
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderDetails>> {
    let mut order = found(state.repo.get_order(id).await?, NOT_FOUND)?;
    let from = order.state;
    let fee = order.cancel(state.config.cancellation_fee_percent)?;
    applied(
        state.repo.cancel_order(&order, from, fee.as_ref()).await?,
        "Order cannot be cancelled in its current state",
    )?;

    tracing::info!(
        order_id = %order.id,
        fee = ?fee.as_ref().map(|f| f.amount),
        "Order cancelled"
    );
    Ok(Json(order_details(&state, order).await?))
}

async fn order_details(state: &AppState, order: Order) -> AppResult<OrderDetails> {
    let payments = state.repo.list_payments(order.id).await?;
    let fee = state.repo.get_order_cancellation_fee(order.id).await?;
    Ok(OrderDetails::new(order, payments, fee))
}
