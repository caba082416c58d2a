use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::{
    AppState,
    auth::{AuthUser, issue_token_pair, verify_password},
    error::{AppError, AppResult, ErrorBody},
    models::{LoginRequest, RefreshRequest, TokenPair, UserProfile},
};

use super::found;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH: &str = "Invalid refresh token";

/// login
///
/// [Public Route] Exchanges staff credentials for an access/refresh token pair.
/// Unknown email, deleted account and wrong password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS.to_string());

    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&payload.password, &user.password_hash).await? {
        return Err(invalid());
    }

    let pair = issue_token_pair(&state.repo, &state.config, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(pair))
}

/// refresh
///
/// [Public Route] Rotates a refresh token: the presented token is revoked and a new
/// pair is issued. A token can therefore be used once.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Unknown, revoked or expired token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let invalid = || AppError::Unauthorized(INVALID_REFRESH.to_string());

    let stored = state
        .repo
        .get_refresh_token(&payload.refresh_token)
        .await?
        .filter(|token| token.is_usable(Utc::now()))
        .ok_or_else(invalid)?;

    let user = state.repo.get_user(stored.user_id).await?.ok_or_else(invalid)?;

    // Losing the revoke race means another request already rotated this token.
    if !state.repo.revoke_refresh_token(&stored.token).await? {
        return Err(invalid());
    }

    let pair = issue_token_pair(&state.repo, &state.config, &user).await?;
    tracing::debug!(user_id = %user.id, "Refresh token rotated");
    Ok(Json(pair))
}

/// logout
///
/// [Public Route] Revokes the refresh token. Idempotent.
#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = RefreshRequest,
    responses((status = 204, description = "Logged out")),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<StatusCode> {
    state.repo.revoke_refresh_token(&payload.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_me
///
/// [Authenticated Route] Profile of the caller.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile)),
    tag = "auth"
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserProfile>> {
    let user = found(state.repo.get_user(id).await?, "User not found")?;
    Ok(Json(user.into()))
}
