use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{AppError, AppResult, ErrorBody},
    models::{CreateCustomerRequest, Customer, UpdateCustomerRequest},
    repository::CustomerFilter,
};

use super::found;

const NOT_FOUND: &str = "Customer not found";

/// create_customer
///
/// New customers start `Pending` until a clerk activates them.
#[utoipa::path(
    post,
    path = "/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Created", body = Customer),
        (status = 404, description = "Unknown city", body = ErrorBody),
        (status = 409, description = "Email taken", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    payload.validate()?;
    found(state.repo.get_city(payload.city_id).await?, "City not found")?;
    if state
        .repo
        .find_customer_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::conflict(
            "A customer with this email already exists",
        ));
    }

    let customer = Customer::new(payload);
    state.repo.create_customer(&customer).await?;
    tracing::info!(customer_id = %customer.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    put,
    path = "/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Updated", body = Customer),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Email taken", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> AppResult<Json<Customer>> {
    payload.validate()?;
    let mut customer = found(state.repo.get_customer(id).await?, NOT_FOUND)?;
    if let Some(city_id) = payload.city_id {
        found(state.repo.get_city(city_id).await?, "City not found")?;
    }

    customer.apply(payload);
    if let Some(other) = state.repo.find_customer_by_email(&customer.email).await? {
        if other.id != customer.id {
            return Err(AppError::conflict(
                "A customer with this email already exists",
            ));
        }
    }
    state.repo.update_customer(&customer).await?;
    Ok(Json(customer))
}

#[utoipa::path(
    get,
    path = "/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Found", body = Customer),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn get_customer_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    Ok(Json(found(state.repo.get_customer(id).await?, NOT_FOUND)?))
}

#[utoipa::path(
    get,
    path = "/customers",
    params(CustomerFilter),
    responses((status = 200, description = "Customers, newest first", body = [Customer])),
    tag = "customers"
)]
pub async fn get_customers(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(state.repo.list_customers(&filter).await?))
}

#[utoipa::path(
    post,
    path = "/customers/{id}/activate",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Activated", body = Customer),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Already active", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn activate_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    let mut customer = found(state.repo.get_customer(id).await?, NOT_FOUND)?;
    customer.activate()?;
    state.repo.update_customer(&customer).await?;
    tracing::info!(customer_id = %customer.id, "Customer activated");
    Ok(Json(customer))
}

#[utoipa::path(
    post,
    path = "/customers/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Deactivated", body = Customer),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Already inactive", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn deactivate_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    let mut customer = found(state.repo.get_customer(id).await?, NOT_FOUND)?;
    customer.deactivate()?;
    state.repo.update_customer(&customer).await?;
    tracing::info!(customer_id = %customer.id, "Customer deactivated");
    Ok(Json(customer))
}
