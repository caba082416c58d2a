use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// CustomerState
///
/// New customers wait in `Pending` until a clerk has checked their documents.
/// Only `Active` customers can place orders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[repr(i32)]
#[ts(export)]
pub enum CustomerState {
    #[default]
    Pending = 0,
    Active = 1,
    Inactive = 2,
}

/// Customer
///
/// A renter. Customers are never deleted; they are deactivated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    // Driving licence or ID card number.
    pub national_id: String,
    pub city_id: Uuid,
    pub state: CustomerState,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(req: CreateCustomerRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            phone: req.phone,
            national_id: req.national_id,
            city_id: req.city_id,
            state: CustomerState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn activate(&mut self) -> AppResult<()> {
        if self.state == CustomerState::Active {
            return Err(AppError::invalid_state("Customer is already active"));
        }
        self.set_state(CustomerState::Active);
        Ok(())
    }

    pub fn deactivate(&mut self) -> AppResult<()> {
        if self.state == CustomerState::Inactive {
            return Err(AppError::invalid_state("Customer is already inactive"));
        }
        self.set_state(CustomerState::Inactive);
        Ok(())
    }

    pub fn apply(&mut self, req: UpdateCustomerRequest) {
        if let Some(first_name) = req.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = req.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(email) = req.email {
            self.email = email.trim().to_lowercase();
        }
        if let Some(phone) = req.phone {
            self.phone = phone;
        }
        if let Some(national_id) = req.national_id {
            self.national_id = national_id;
        }
        if let Some(city_id) = req.city_id {
            self.city_id = city_id;
        }
        self.updated_at = Utc::now();
    }

    /// Case-insensitive match on names, email and phone, used by the customer search box.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.first_name, &self.last_name, &self.email, &self.phone]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    fn set_state(&mut self, state: CustomerState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// CreateCustomerRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 60))]
    pub first_name: String,
    #[validate(length(min = 1, max = 60))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(min = 3, max = 40))]
    pub national_id: String,
    pub city_id: Uuid,
}

/// UpdateCustomerRequest
///
/// Partial update; the state is changed only through activate/deactivate.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCustomerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 60))]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 60))]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 5, max = 20))]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_id: Option<Uuid>,
}
