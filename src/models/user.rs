use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EMPLOYEE: &str = "employee";

/// User
///
/// A back-office staff account stored in `users`. Never serialized directly: the
/// password hash stays server-side and callers receive a `UserProfile`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    // RBAC field: 'admin' or 'employee'.
    pub role: String,
    // Soft-delete marker set by the delete-user command.
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, full_name: String, password_hash: String, role: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            full_name,
            password_hash,
            role,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// RefreshToken
///
/// Opaque long-lived token exchanged for a new access token. Rotated on every use.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn issue(user_id: Uuid, ttl_days: i64) -> Self {
        let now = Utc::now();
        Self {
            // Two v4 UUIDs give 244 bits of randomness.
            token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            user_id,
            expires_at: now + chrono::Duration::days(ttl_days),
            revoked: false,
            created_at: now,
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// UserProfile
///
/// Public view of a staff account (GET /me, admin user listing).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// CreateUserRequest
///
/// Input payload for POST /admin/users.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[schema(example = "employee")]
    pub role: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RefreshRequest
///
/// Body of POST /auth/refresh and POST /auth/logout.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// TokenPair
///
/// Issued on login and on every refresh. The dashboard interceptor stores both and
/// replays the refresh token when an access token is rejected with 401.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}
