use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{AppError, AppResult, ErrorBody},
    models::{
        Category, City, CreateCategoryRequest, CreateCityRequest, CreateSubCategoryRequest,
        SubCategory, UpdateCategoryRequest, UpdateSubCategoryRequest,
    },
};

use super::found;

/// SubCategoryFilter
///
/// Query parameters of GET /sub-categories.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SubCategoryFilter {
    pub category_id: Option<Uuid>,
}

// --- Cities ---

#[utoipa::path(
    post,
    path = "/cities",
    request_body = CreateCityRequest,
    responses(
        (status = 201, description = "Created", body = City),
        (status = 409, description = "Duplicate name", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn create_city(
    State(state): State<AppState>,
    Json(payload): Json<CreateCityRequest>,
) -> AppResult<(StatusCode, Json<City>)> {
    payload.validate()?;
    if state.repo.find_city_by_name(&payload.name).await?.is_some() {
        return Err(AppError::conflict("City already exists"));
    }
    let city = City::new(payload.name);
    state.repo.create_city(&city).await?;
    Ok((StatusCode::CREATED, Json(city)))
}

#[utoipa::path(
    get,
    path = "/cities",
    responses((status = 200, description = "Cities by name", body = [City])),
    tag = "catalog"
)]
pub async fn get_cities(State(state): State<AppState>) -> AppResult<Json<Vec<City>>> {
    Ok(Json(state.repo.list_cities().await?))
}

// --- Categories ---

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses((status = 201, description = "Created", body = Category)),
    tag = "catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    payload.validate()?;
    let category = Category::new(payload);
    state.repo.create_category(&category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<Category>> {
    payload.validate()?;
    let mut category = found(state.repo.get_category(id).await?, "Category not found")?;
    category.apply(payload);
    state.repo.update_category(&category).await?;
    Ok(Json(category))
}

#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories by name", body = [Category])),
    tag = "catalog"
)]
pub async fn get_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn get_category_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    Ok(Json(found(
        state.repo.get_category(id).await?,
        "Category not found",
    )?))
}

// --- Sub-categories ---

/// create_sub_category
///
/// The parent category must exist and the daily price must be positive.
#[utoipa::path(
    post,
    path = "/sub-categories",
    request_body = CreateSubCategoryRequest,
    responses(
        (status = 201, description = "Created", body = SubCategory),
        (status = 400, description = "Non-positive price", body = ErrorBody),
        (status = 404, description = "Unknown category", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn create_sub_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubCategoryRequest>,
) -> AppResult<(StatusCode, Json<SubCategory>)> {
    payload.validate()?;
    found(
        state.repo.get_category(payload.category_id).await?,
        "Category not found",
    )?;
    let sub_category = SubCategory::new(payload)?;
    state.repo.create_sub_category(&sub_category).await?;
    Ok((StatusCode::CREATED, Json(sub_category)))
}

#[utoipa::path(
    put,
    path = "/sub-categories/{id}",
    params(("id" = Uuid, Path, description = "Sub-category ID")),
    request_body = UpdateSubCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = SubCategory),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn update_sub_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubCategoryRequest>,
) -> AppResult<Json<SubCategory>> {
    payload.validate()?;
    let mut sub_category = found(
        state.repo.get_sub_category(id).await?,
        "Sub-category not found",
    )?;
    sub_category.apply(payload)?;
    state.repo.update_sub_category(&sub_category).await?;
    Ok(Json(sub_category))
}

#[utoipa::path(
    get,
    path = "/sub-categories",
    params(SubCategoryFilter),
    responses((status = 200, description = "Sub-categories by name", body = [SubCategory])),
    tag = "catalog"
)]
pub async fn get_sub_categories(
    State(state): State<AppState>,
    Query(filter): Query<SubCategoryFilter>,
) -> AppResult<Json<Vec<SubCategory>>> {
    Ok(Json(state.repo.list_sub_categories(filter.category_id).await?))
}

#[utoipa::path(
    get,
    path = "/sub-categories/{id}",
    params(("id" = Uuid, Path, description = "Sub-category ID")),
    responses(
        (status = 200, description = "Found", body = SubCategory),
        (status = 404, description = "Not Found", body = ErrorBody)
    ),
    tag = "catalog"
)]
pub async fn get_sub_category_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubCategory>> {
    Ok(Json(found(
        state.repo.get_sub_category(id).await?,
        "Sub-category not found",
    )?))
}
