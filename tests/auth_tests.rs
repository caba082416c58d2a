mod common;

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use chrono::Utc;
use common::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use rentdesk::{
    AppError, AppState,
    auth::{AuthUser, Claims},
    config::Env,
    handlers,
    models::{LoginRequest, RefreshRequest},
};
use uuid::Uuid;

/// Builds a signed token for `user_id` that expires `exp_offset` seconds from now.
fn create_token(user_id: Uuid, exp_offset: i64, secret: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        role: "employee".to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    parts
}

fn production(state: AppState) -> AppState {
    let mut state = state;
    state.config.env = Env::Production;
    state
}

fn unauthorized_message(result: Result<AuthUser, AppError>) -> String {
    match result {
        Err(AppError::Unauthorized(msg)) => msg,
        other => panic!("expected 401, got {other:?}"),
    }
}

// --- Extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let state = test_state();
    let user = seed_employee(&state).await;
    let token = create_token(user.id, 3600, &state.config.jwt_secret);

    let auth_user = AuthUser::from_request_parts(&mut with_bearer(&token), &state)
        .await
        .unwrap();
    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.role, "employee");
    assert!(!auth_user.is_admin());
}

#[tokio::test]
async fn test_role_is_read_from_the_database() {
    let state = test_state();
    let admin = seed_admin(&state).await;
    // The token claims "employee"; the stored role wins.
    let token = create_token(admin.id, 3600, &state.config.jwt_secret);

    let auth_user = AuthUser::from_request_parts(&mut with_bearer(&token), &state)
        .await
        .unwrap();
    assert!(auth_user.is_admin());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = test_state();
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(unauthorized_message(result), "Missing bearer token");
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let state = test_state();
    let user = seed_employee(&state).await;
    // Well beyond the default validation leeway.
    let token = create_token(user.id, -3600, &state.config.jwt_secret);

    let result = AuthUser::from_request_parts(&mut with_bearer(&token), &state).await;
    assert_eq!(unauthorized_message(result), "Token expired");
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let state = test_state();
    let user = seed_employee(&state).await;
    let token = create_token(user.id, 3600, "not-the-server-secret");

    let result = AuthUser::from_request_parts(&mut with_bearer(&token), &state).await;
    assert_eq!(unauthorized_message(result), "Invalid token");

    let result = AuthUser::from_request_parts(&mut with_bearer("garbage"), &state).await;
    assert_eq!(unauthorized_message(result), "Invalid token");
}

#[tokio::test]
async fn test_deleted_user_is_rejected() {
    let state = test_state();
    let admin = seed_admin(&state).await;
    let clerk = seed_employee(&state).await;
    let token = create_token(clerk.id, 3600, &state.config.jwt_secret);

    handlers::delete_user(as_auth(&admin), State(state.clone()), axum::extract::Path(clerk.id))
        .await
        .unwrap();

    let result = AuthUser::from_request_parts(&mut with_bearer(&token), &state).await;
    assert_eq!(unauthorized_message(result), "User no longer exists");
}

#[tokio::test]
async fn test_local_bypass_success() {
    let state = test_state();
    let admin = seed_admin(&state).await;

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&admin.id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth_user.id, admin.id);
    assert_eq!(auth_user.role, "admin");
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = production(test_state());
    let admin = seed_admin(&state).await;

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&admin.id.to_string()).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(unauthorized_message(result), "Missing bearer token");
}

// --- Session handlers ---

fn login_request(email: &str, password: &str) -> Json<LoginRequest> {
    Json(LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    })
}

fn refresh_request(token: &str) -> Json<RefreshRequest> {
    Json(RefreshRequest {
        refresh_token: token.to_string(),
    })
}

#[tokio::test]
async fn test_login_issues_usable_token_pair() {
    let state = test_state();
    let user = seed_employee(&state).await;

    let Json(pair) = handlers::login(
        State(state.clone()),
        login_request("DESK@rentdesk.test", TEST_PASSWORD),
    )
    .await
    .unwrap();
    assert_eq!(pair.token_type, "Bearer");
    assert_eq!(pair.expires_in, 15 * 60);

    let auth_user = AuthUser::from_request_parts(&mut with_bearer(&pair.access_token), &state)
        .await
        .unwrap();
    assert_eq!(auth_user.id, user.id);

    let Json(me) = handlers::get_me(auth_user, State(state)).await.unwrap();
    assert_eq!(me.email, "desk@rentdesk.test");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let state = test_state();
    seed_employee(&state).await;

    let wrong_password = handlers::login(State(state.clone()), login_request("desk@rentdesk.test", "nope"))
        .await
        .unwrap_err();
    let unknown_email = handlers::login(State(state), login_request("ghost@rentdesk.test", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert_eq!(wrong_password.to_string(), "Invalid email or password");
    assert_eq!(unknown_email.to_string(), wrong_password.to_string());
}

#[tokio::test]
async fn test_refresh_tokens_rotate() {
    let state = test_state();
    seed_employee(&state).await;

    let Json(first) = handlers::login(State(state.clone()), login_request("desk@rentdesk.test", TEST_PASSWORD))
        .await
        .unwrap();

    let Json(second) = handlers::refresh(State(state.clone()), refresh_request(&first.refresh_token))
        .await
        .unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);

    let err = handlers::refresh(State(state.clone()), refresh_request(&first.refresh_token))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid refresh token");

    handlers::refresh(State(state), refresh_request(&second.refresh_token))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let state = test_state();
    seed_employee(&state).await;

    let Json(pair) = handlers::login(State(state.clone()), login_request("desk@rentdesk.test", TEST_PASSWORD))
        .await
        .unwrap();

    let status = handlers::logout(State(state.clone()), refresh_request(&pair.refresh_token))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Idempotent.
    let status = handlers::logout(State(state.clone()), refresh_request(&pair.refresh_token))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = handlers::refresh(State(state), refresh_request(&pair.refresh_token))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_deleting_user_revokes_sessions() {
    let state = test_state();
    let admin = seed_admin(&state).await;
    let clerk = seed_employee(&state).await;

    let Json(pair) = handlers::login(State(state.clone()), login_request("desk@rentdesk.test", TEST_PASSWORD))
        .await
        .unwrap();

    handlers::delete_user(as_auth(&admin), State(state.clone()), axum::extract::Path(clerk.id))
        .await
        .unwrap();

    let err = handlers::refresh(State(state.clone()), refresh_request(&pair.refresh_token))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = handlers::login(State(state), login_request("desk@rentdesk.test", TEST_PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}
