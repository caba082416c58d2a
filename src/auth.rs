use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{ROLE_ADMIN, RefreshToken, TokenPair, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of an access token. Signed with the server's HS256 secret and validated
/// on every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the staff user.
    pub sub: Uuid,
    /// Expiration Time (exp): seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    /// Role at issue time. Informational only; the extractor re-reads it from the database.
    pub role: String,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an argument
/// to learn who is calling and to gate admin-only operations.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// 'admin' or 'employee'.
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Rejects the request with 403 unless the caller is an administrator.
    pub fn require_admin(&self) -> AppResult<()> {
        if !self.is_admin() {
            tracing::warn!(user_id = %self.id, role = %self.role, "Admin route denied");
            return Err(AppError::forbidden());
        }
        Ok(())
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Dependency Resolution: repository and configuration from the application state.
/// 2. Local Bypass: `x-user-id` naming an existing user, only in `Env::Local`.
/// 3. Token Validation: `Authorization: Bearer <jwt>`, HS256, `exp` enforced.
/// 4. DB Lookup: the user must still exist and must not be soft-deleted.
///
/// Rejection: 401 with the standard error body on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return Ok(AuthUser {
                        id: user.id,
                        role: user.role,
                    });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("Missing bearer token"))?;

        let claims = decode_access_token(token, &config.jwt_secret)?;

        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| unauthorized("User no longer exists"))?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Unauthorized(msg.to_string())
}

/// issue_access_token
///
/// Signs a short-lived access token for `user` with the configured TTL.
pub fn issue_access_token(user: &User, config: &AppConfig) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(config.access_token_ttl_minutes)).timestamp() as usize,
        role: user.role.clone(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign access token: {e}")))
}

/// decode_access_token
///
/// Verifies signature and expiry. Every failure collapses into 401.
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => unauthorized("Token expired"),
            _ => unauthorized("Invalid token"),
        })
}

/// issue_token_pair
///
/// Signs an access token and stores a fresh refresh token for `user`.
pub async fn issue_token_pair(
    repo: &RepositoryState,
    config: &AppConfig,
    user: &User,
) -> AppResult<TokenPair> {
    let access_token = issue_access_token(user, config)?;
    let refresh = RefreshToken::issue(user.id, config.refresh_token_ttl_days);
    repo.store_refresh_token(&refresh).await?;

    Ok(TokenPair {
        access_token,
        refresh_token: refresh.token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl_minutes * 60,
    })
}

/// Hashes on the blocking pool; bcrypt at production cost takes tens of milliseconds.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {e}")))
}
