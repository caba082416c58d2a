use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, hash_password},
    error::{AppError, AppResult, ErrorBody},
    models::{CreateUserRequest, ROLE_ADMIN, ROLE_EMPLOYEE, User, UserProfile},
};

use super::found;

/// create_user
///
/// [Admin Route] Creates a staff account with a bcrypt-hashed password.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 400, description = "Invalid payload or unknown role", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody),
        (status = 409, description = "Email taken, deleted accounts included", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    auth.require_admin()?;
    payload.validate()?;

    if payload.role != ROLE_ADMIN && payload.role != ROLE_EMPLOYEE {
        return Err(AppError::bad_request("Unknown role"));
    }
    if state.repo.user_email_taken(&payload.email).await? {
        return Err(AppError::conflict("A user with this email already exists"));
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost).await?;
    let user = User::new(payload.email, payload.full_name, password_hash, payload.role);
    state.repo.create_user(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %auth.id, "User created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// get_users
///
/// [Admin Route] Non-deleted staff accounts, newest first.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Users", body = [UserProfile])),
    tag = "users"
)]
pub async fn get_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserProfile>>> {
    auth.require_admin()?;
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserProfile),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserProfile>> {
    auth.require_admin()?;
    let user = found(state.repo.get_user(id).await?, "User not found")?;
    Ok(Json(user.into()))
}

/// delete_user
///
/// [Admin Route] Soft-deletes a staff account and revokes its sessions. An
/// administrator cannot delete their own account.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Self deletion", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    if id == auth.id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }
    if !state.repo.soft_delete_user(id).await? {
        return Err(AppError::not_found("User not found"));
    }
    tracing::info!(user_id = %id, deleted_by = %auth.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
