use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod reports;
pub mod repository;
pub mod storage;

// Routing segregated by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document generated from the `#[utoipa::path]` handlers and `ToSchema`
/// models, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::refresh, handlers::logout, handlers::get_me,
        handlers::create_user, handlers::get_users, handlers::get_user_by_id, handlers::delete_user,
        handlers::create_city, handlers::get_cities,
        handlers::create_category, handlers::update_category, handlers::get_categories,
        handlers::get_category_by_id, handlers::create_sub_category, handlers::update_sub_category,
        handlers::get_sub_categories, handlers::get_sub_category_by_id,
        handlers::create_vehicle, handlers::update_vehicle, handlers::get_vehicle_by_id,
        handlers::get_vehicles, handlers::set_vehicle_active, handlers::request_vehicle_image_upload,
        handlers::create_customer, handlers::update_customer, handlers::get_customer_by_id,
        handlers::get_customers, handlers::activate_customer, handlers::deactivate_customer,
        handlers::create_order, handlers::get_order_by_id, handlers::get_orders,
        handlers::confirm_order, handlers::start_order, handlers::complete_order,
        handlers::cancel_order,
        handlers::create_payment, handlers::get_order_payments, handlers::get_payment_by_id,
        handlers::confirm_payment, handlers::refund_payment,
        handlers::get_cancellation_fees, handlers::get_cancellation_fee_by_id,
        handlers::pay_cancellation_fee, handlers::waive_cancellation_fee,
        handlers::get_reserved_vehicles,
        handlers::get_treasury_balance, handlers::get_treasury_entries,
        handlers::get_revenue_report, handlers::get_cancellation_report,
        handlers::get_vehicle_utilization_report, handlers::get_order_state_report,
        handlers::get_admin_stats
    ),
    components(
        schemas(
            error::ErrorBody,
            models::UserProfile, models::CreateUserRequest, models::LoginRequest,
            models::RefreshRequest, models::TokenPair,
            models::City, models::CreateCityRequest,
            models::Category, models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::SubCategory, models::CreateSubCategoryRequest, models::UpdateSubCategoryRequest,
            models::Vehicle, models::CreateVehicleRequest, models::UpdateVehicleRequest,
            models::SetVehicleActiveRequest, models::ImageUploadRequest, models::ImageUploadResponse,
            models::Customer, models::CustomerState, models::CreateCustomerRequest,
            models::UpdateCustomerRequest,
            models::Order, models::OrderState, models::CreateOrderRequest, models::OrderDetails,
            models::OrderPayment, models::PaymentState, models::CreatePaymentRequest,
            models::OrderCancellationFee, models::CancellationFeeState,
            models::CompanyTreasury, models::TreasurySource, models::TreasuryBalance,
            models::ReservedVehiclePerDay, models::ReservedVehicleState, models::VehicleBookedDays,
            models::MonthlyRevenue, models::RevenueReport, models::CancellationReport,
            models::VehicleUtilization, models::VehicleUtilizationReport,
            models::OrderStateCount, models::OrderStateReport, models::DashboardStats,
        )
    ),
    tags(
        (name = "rentdesk", description = "Vehicle rental back-office API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single immutable container shared by every request: persistence, object
/// storage and configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull single components out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor ahead of every authenticated route. A failed
/// extraction short-circuits with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, the scoped auth layer, the observability stack and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Role checks for these happen inside the handlers.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by `SetRequestIdLayer`
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
