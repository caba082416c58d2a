use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token: liveness and the login/refresh/logout
/// exchange used by the dashboard's token interceptor.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for the load balancer.
        .route("/health", get(|| async { "ok" }))
        .route("/auth/login", post(handlers::login))
        // POST /auth/refresh
        // Called by the dashboard after a 401; rotates the refresh token.
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
}
