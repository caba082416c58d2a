use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{AppResult, ErrorBody},
    models::{CreatePaymentRequest, OrderPayment, PaymentState},
};

use super::{applied, found};

const NOT_FOUND: &str = "Payment not found";

/// create_payment
///
/// Records a pending payment against an order. Pending and paid payments together
/// may not exceed the order total.
#[utoipa::path(
    post,
    path = "/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Recorded", body = OrderPayment),
        (status = 400, description = "Non-positive or excessive amount", body = ErrorBody),
        (status = 404, description = "Unknown order", body = ErrorBody),
        (status = 422, description = "Order cancelled", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<OrderPayment>)> {
    payload.validate()?;
    let order = found(state.repo.get_order(order_id).await?, "Order not found")?;

    let committed: Decimal = state
        .repo
        .list_payments(order.id)
        .await?
        .iter()
        .filter(|p| matches!(p.state, PaymentState::Pending | PaymentState::Paid))
        .map(|p| p.amount)
        .sum();

    let payment = OrderPayment::new(&order, committed, payload)?;
    state.repo.create_payment(&payment).await?;
    tracing::info!(payment_id = %payment.id, order_id = %order.id, amount = %payment.amount, "Payment recorded");
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Payments, oldest first", body = [OrderPayment]),
        (status = 404, description = "Unknown order", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn get_order_payments(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Vec<OrderPayment>>> {
    found(state.repo.get_order(order_id).await?, "Order not found")?;
    Ok(Json(state.repo.list_payments(order_id).await?))
}

#[utoipa::path(
    get,
    path = "/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Found", body = OrderPayment),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn get_payment_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderPayment>> {
    Ok(Json(found(state.repo.get_payment(id).await?, NOT_FOUND)?))
}

/// confirm_payment
///
/// Pending → Paid. The treasury is credited in the same transaction.
#[utoipa::path(
    post,
    path = "/payments/{id}/confirm",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Paid", body = OrderPayment),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Not pending", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderPayment>> {
    let mut payment = found(state.repo.get_payment(id).await?, NOT_FOUND)?;
    let credit = payment.confirm()?;
    applied(
        state.repo.settle_payment(&payment, PaymentState::Pending, &credit).await?,
        "Only pending payments can be confirmed",
    )?;
    tracing::info!(payment_id = %payment.id, amount = %payment.amount, "Payment confirmed");
    Ok(Json(payment))
}

/// refund_payment
///
/// Paid → Refunded. The treasury is debited in the same transaction.
#[utoipa::path(
    post,
    path = "/payments/{id}/refund",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Refunded", body = OrderPayment),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Not paid", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn refund_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderPayment>> {
    let mut payment = found(state.repo.get_payment(id).await?, NOT_FOUND)?;
    let debit = payment.refund()?;
    applied(
        state.repo.settle_payment(&payment, PaymentState::Paid, &debit).await?,
        "Only paid payments can be refunded",
    )?;
    tracing::info!(payment_id = %payment.id, amount = %payment.amount, "Payment refunded");
    Ok(Json(payment))
}
