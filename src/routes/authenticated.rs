use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `auth_middleware` layer installed in
/// `create_router`, so handlers can rely on a resolved `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/me", get(handlers::get_me))
        // --- Reference data ---
        .route(
            "/cities",
            get(handlers::get_cities).post(handlers::create_city),
        )
        .route(
            "/categories",
            get(handlers::get_categories).post(handlers::create_category),
        )
        .route(
            "/categories/{id}",
            get(handlers::get_category_by_id).put(handlers::update_category),
        )
        .route(
            "/sub-categories",
            get(handlers::get_sub_categories).post(handlers::create_sub_category),
        )
        .route(
            "/sub-categories/{id}",
            get(handlers::get_sub_category_by_id).put(handlers::update_sub_category),
        )
        // --- Fleet ---
        .route(
            "/vehicles",
            get(handlers::get_vehicles).post(handlers::create_vehicle),
        )
        .route(
            "/vehicles/{id}",
            get(handlers::get_vehicle_by_id).put(handlers::update_vehicle),
        )
        .route("/vehicles/{id}/active", put(handlers::set_vehicle_active))
        // POST /vehicles/{id}/image
        // Hands out a presigned S3 PUT URL; the photo never transits this server.
        .route(
            "/vehicles/{id}/image",
            post(handlers::request_vehicle_image_upload),
        )
        // --- Customers ---
        .route(
            "/customers",
            get(handlers::get_customers).post(handlers::create_customer),
        )
        .route(
            "/customers/{id}",
            get(handlers::get_customer_by_id).put(handlers::update_customer),
        )
        .route(
            "/customers/{id}/activate",
            post(handlers::activate_customer),
        )
        .route(
            "/customers/{id}/deactivate",
            post(handlers::deactivate_customer),
        )
        // --- Orders ---
        .route(
            "/orders",
            get(handlers::get_orders).post(handlers::create_order),
        )
        .route("/orders/{id}", get(handlers::get_order_by_id))
        .route("/orders/{id}/confirm", post(handlers::confirm_order))
        .route("/orders/{id}/start", post(handlers::start_order))
        .route("/orders/{id}/complete", post(handlers::complete_order))
        .route("/orders/{id}/cancel", post(handlers::cancel_order))
        // --- Money ---
        .route(
            "/orders/{id}/payments",
            get(handlers::get_order_payments).post(handlers::create_payment),
        )
        .route("/payments/{id}", get(handlers::get_payment_by_id))
        .route("/payments/{id}/confirm", post(handlers::confirm_payment))
        .route("/payments/{id}/refund", post(handlers::refund_payment))
        .route(
            "/cancellation-fees",
            get(handlers::get_cancellation_fees),
        )
        .route(
            "/cancellation-fees/{id}",
            get(handlers::get_cancellation_fee_by_id),
        )
        .route(
            "/cancellation-fees/{id}/pay",
            post(handlers::pay_cancellation_fee),
        )
        .route(
            "/cancellation-fees/{id}/waive",
            post(handlers::waive_cancellation_fee),
        )
        // GET /reservations?sub_category_id=..&from=..&to=..
        // Availability grid: booked days per vehicle of one sub-category.
        .route("/reservations", get(handlers::get_reserved_vehicles))
}
