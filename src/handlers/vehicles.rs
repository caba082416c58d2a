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
    models::{
        CreateVehicleRequest, ImageUploadRequest, ImageUploadResponse, SetVehicleActiveRequest,
        UpdateVehicleRequest, Vehicle,
    },
    repository::VehicleFilter,
    storage::vehicle_image_key,
};

use super::found;

/// create_vehicle
///
/// Registers a vehicle in service. Sub-category and city must exist; plates are unique.
#[utoipa::path(
    post,
    path = "/vehicles",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Created", body = Vehicle),
        (status = 404, description = "Unknown sub-category or city", body = ErrorBody),
        (status = 409, description = "Duplicate plate", body = ErrorBody)
    ),
    tag = "vehicles"
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    Json(payload): Json<CreateVehicleRequest>,
) -> AppResult<(StatusCode, Json<Vehicle>)> {
    payload.validate()?;
    found(
        state.repo.get_sub_category(payload.sub_category_id).await?,
        "Sub-category not found",
    )?;
    found(state.repo.get_city(payload.city_id).await?, "City not found")?;

    let vehicle = Vehicle::new(payload);
    if state
        .repo
        .find_vehicle_by_plate(&vehicle.plate_number)
        .await?
        .is_some()
    {
        return Err(AppError::conflict(
            "A vehicle with this plate number already exists",
        ));
    }
    state.repo.create_vehicle(&vehicle).await?;
    tracing::info!(vehicle_id = %vehicle.id, plate = %vehicle.plate_number, "Vehicle registered");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

#[utoipa::path(
    put,
    path = "/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Updated", body = Vehicle),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Duplicate plate", body = ErrorBody)
    ),
    tag = "vehicles"
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVehicleRequest>,
) -> AppResult<Json<Vehicle>> {
    payload.validate()?;
    let mut vehicle = found(state.repo.get_vehicle(id).await?, "Vehicle not found")?;

    if let Some(sub_category_id) = payload.sub_category_id {
        found(
            state.repo.get_sub_category(sub_category_id).await?,
            "Sub-category not found",
        )?;
    }
    if let Some(city_id) = payload.city_id {
        found(state.repo.get_city(city_id).await?, "City not found")?;
    }

    vehicle.apply(payload);
    if let Some(other) = state.repo.find_vehicle_by_plate(&vehicle.plate_number).await? {
        if other.id != vehicle.id {
            return Err(AppError::conflict(
                "A vehicle with this plate number already exists",
            ));
        }
    }
    state.repo.update_vehicle(&vehicle).await?;
    Ok(Json(vehicle))
}

#[utoipa::path(
    get,
    path = "/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Found", body = Vehicle),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "vehicles"
)]
pub async fn get_vehicle_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vehicle>> {
    Ok(Json(found(
        state.repo.get_vehicle(id).await?,
        "Vehicle not found",
    )?))
}

#[utoipa::path(
    get,
    path = "/vehicles",
    params(VehicleFilter),
    responses((status = 200, description = "Vehicles by plate", body = [Vehicle])),
    tag = "vehicles"
)]
pub async fn get_vehicles(
    State(state): State<AppState>,
    Query(filter): Query<VehicleFilter>,
) -> AppResult<Json<Vec<Vehicle>>> {
    Ok(Json(state.repo.list_vehicles(&filter).await?))
}

/// set_vehicle_active
///
/// Takes a vehicle out of service or puts it back. Existing orders are untouched.
#[utoipa::path(
    put,
    path = "/vehicles/{id}/active",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = SetVehicleActiveRequest,
    responses(
        (status = 200, description = "Updated", body = Vehicle),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Already in that state", body = ErrorBody)
    ),
    tag = "vehicles"
)]
pub async fn set_vehicle_active(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetVehicleActiveRequest>,
) -> AppResult<Json<Vehicle>> {
    let mut vehicle = found(state.repo.get_vehicle(id).await?, "Vehicle not found")?;
    vehicle.set_active(payload.is_active)?;
    state.repo.update_vehicle(&vehicle).await?;
    tracing::info!(vehicle_id = %vehicle.id, is_active = vehicle.is_active, "Vehicle availability changed");
    Ok(Json(vehicle))
}

/// request_vehicle_image_upload
///
/// Issues a 10-minute presigned PUT URL for a vehicle photo and records the object key
/// on the vehicle. The client uploads straight to object storage.
#[utoipa::path(
    post,
    path = "/vehicles/{id}/image",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = ImageUploadRequest,
    responses(
        (status = 200, description = "Upload URL", body = ImageUploadResponse),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    ),
    tag = "vehicles"
)]
pub async fn request_vehicle_image_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ImageUploadRequest>,
) -> AppResult<Json<ImageUploadResponse>> {
    let mut vehicle = found(state.repo.get_vehicle(id).await?, "Vehicle not found")?;

    let key = vehicle_image_key(vehicle.id, &payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &payload.file_type)
        .await?;

    vehicle.set_image(key.clone());
    state.repo.update_vehicle(&vehicle).await?;

    Ok(Json(ImageUploadResponse {
        upload_url,
        resource_key: key,
    }))
}
