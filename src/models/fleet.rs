use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::round2;
use crate::error::{AppError, AppResult};

// --- Cities ---

/// City
///
/// A branch location. Vehicles and customers are attached to a city.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl City {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateCityRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

// --- Categories ---

/// Category
///
/// Top-level vehicle grouping (e.g. "SUV", "Van").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(req: CreateCategoryRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            description: req.description,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, req: UpdateCategoryRequest) {
        if let Some(name) = req.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = req.description {
            self.description = Some(description);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub description: Option<String>,
}

/// UpdateCategoryRequest
///
/// Partial update: only `Some` fields are applied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// --- Sub-categories ---

/// SubCategory
///
/// A priced vehicle class inside a category. Its `price_per_day` is copied onto
/// each order as the order's daily rate.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct SubCategory {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "49.90")]
    pub price_per_day: Decimal,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl SubCategory {
    pub fn new(req: CreateSubCategoryRequest) -> AppResult<Self> {
        let price_per_day = checked_price(req.price_per_day)?;
        Ok(Self {
            id: Uuid::new_v4(),
            category_id: req.category_id,
            name: req.name.trim().to_string(),
            price_per_day,
            created_at: Utc::now(),
        })
    }

    pub fn apply(&mut self, req: UpdateSubCategoryRequest) -> AppResult<()> {
        if let Some(price) = req.price_per_day {
            self.price_per_day = checked_price(price)?;
        }
        if let Some(name) = req.name {
            self.name = name.trim().to_string();
        }
        Ok(())
    }
}

/// Rounds to cents first so the stored price is the one that was validated.
fn checked_price(price: Decimal) -> AppResult<Decimal> {
    let price = round2(price);
    if price <= Decimal::ZERO {
        return Err(AppError::bad_request(
            "Price per day must be greater than zero",
        ));
    }
    Ok(price)
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateSubCategoryRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "49.90")]
    pub price_per_day: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateSubCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub price_per_day: Option<Decimal>,
}

// --- Vehicles ---

/// Vehicle
///
/// A rentable unit of the fleet. `is_active = false` takes it out of service: no new
/// orders can be placed on it, existing reservations are untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Vehicle {
    pub id: Uuid,
    pub sub_category_id: Uuid,
    pub city_id: Uuid,
    pub plate_number: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    // S3 key of the vehicle photo, set after a presigned upload is requested.
    pub image_key: Option<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(req: CreateVehicleRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sub_category_id: req.sub_category_id,
            city_id: req.city_id,
            plate_number: normalize_plate(&req.plate_number),
            brand: req.brand,
            model: req.model,
            year: req.year,
            color: req.color,
            image_key: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, req: UpdateVehicleRequest) {
        if let Some(sub_category_id) = req.sub_category_id {
            self.sub_category_id = sub_category_id;
        }
        if let Some(city_id) = req.city_id {
            self.city_id = city_id;
        }
        if let Some(plate) = req.plate_number {
            self.plate_number = normalize_plate(&plate);
        }
        if let Some(brand) = req.brand {
            self.brand = brand;
        }
        if let Some(model) = req.model {
            self.model = model;
        }
        if let Some(year) = req.year {
            self.year = year;
        }
        if let Some(color) = req.color {
            self.color = color;
        }
        self.updated_at = Utc::now();
    }

    /// set_active
    ///
    /// Puts the vehicle in or out of service. Re-applying the current value is rejected.
    pub fn set_active(&mut self, is_active: bool) -> AppResult<()> {
        if self.is_active == is_active {
            return Err(AppError::invalid_state(if is_active {
                "Vehicle is already active"
            } else {
                "Vehicle is already inactive"
            }));
        }
        self.is_active = is_active;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_image(&mut self, key: String) {
        self.image_key = Some(key);
        self.updated_at = Utc::now();
    }
}

fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateVehicleRequest {
    pub sub_category_id: Uuid,
    pub city_id: Uuid,
    #[validate(length(min = 2, max = 16))]
    #[schema(example = "AB-123-CD")]
    pub plate_number: String,
    #[validate(length(min = 1, max = 60))]
    pub brand: String,
    #[validate(length(min = 1, max = 60))]
    pub model: String,
    #[validate(range(min = 1950, max = 2100))]
    pub year: i32,
    #[validate(length(min = 1, max = 30))]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateVehicleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 16))]
    pub plate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// SetVehicleActiveRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetVehicleActiveRequest {
    pub is_active: bool,
}

/// ImageUploadRequest
///
/// Input payload for requesting a short-lived S3 upload URL for a vehicle photo.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct ImageUploadRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "front.jpg")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// ImageUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct ImageUploadResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key now stored on the vehicle.
    pub resource_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_category(price: &str) -> AppResult<SubCategory> {
        SubCategory::new(CreateSubCategoryRequest {
            category_id: Uuid::new_v4(),
            name: " Compact ".to_string(),
            price_per_day: price.parse().unwrap(),
        })
    }

    #[test]
    fn price_is_stored_in_cents() {
        let compact = sub_category("39.995").unwrap();
        assert_eq!(compact.price_per_day, Decimal::new(4000, 2));
        assert_eq!(compact.name, "Compact");
    }

    #[test]
    fn price_that_rounds_to_zero_is_rejected() {
        let err = sub_category("0.001").unwrap_err();
        assert_eq!(err.to_string(), "Price per day must be greater than zero");

        let mut compact = sub_category("40.00").unwrap();
        let err = compact
            .apply(UpdateSubCategoryRequest {
                name: None,
                price_per_day: Some("0.004".parse().unwrap()),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Price per day must be greater than zero");
        assert_eq!(compact.price_per_day, Decimal::new(4000, 2));
    }
}
