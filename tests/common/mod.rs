#![allow(dead_code)]

use axum::{Json, extract::State};
use chrono::NaiveDate;
use rentdesk::{
    AppConfig, AppState, InMemoryRepository, MockStorageService,
    auth::{AuthUser, hash_password},
    handlers,
    models::{
        City, CreateCategoryRequest, CreateCityRequest, CreateCustomerRequest,
        CreateOrderRequest, CreateSubCategoryRequest, CreateVehicleRequest, Customer, Order,
        ROLE_ADMIN, ROLE_EMPLOYEE, SubCategory, User, Vehicle,
    },
    repository::RepositoryState,
    storage::StorageState,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Fresh state over the in-memory repository and the succeeding storage mock.
pub fn test_state() -> AppState {
    state_with_storage(Arc::new(MockStorageService::new()))
}

pub fn state_with_storage(storage: StorageState) -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        storage,
        config: AppConfig::default(),
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn money(raw: &str) -> Decimal {
    raw.parse().unwrap()
}

pub async fn seed_user(state: &AppState, email: &str, role: &str) -> User {
    let hash = hash_password(TEST_PASSWORD, state.config.bcrypt_cost)
        .await
        .unwrap();
    let user = User::new(email.to_string(), "Test User".to_string(), hash, role.to_string());
    state.repo.create_user(&user).await.unwrap();
    user
}

pub async fn seed_admin(state: &AppState) -> User {
    seed_user(state, "admin@rentdesk.test", ROLE_ADMIN).await
}

pub async fn seed_employee(state: &AppState) -> User {
    seed_user(state, "desk@rentdesk.test", ROLE_EMPLOYEE).await
}

pub fn as_auth(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role.clone(),
    }
}

/// A city, a category with one sub-category priced at 50.00 a day, and one vehicle in it.
pub struct Fleet {
    pub city: City,
    pub sub_category: SubCategory,
    pub vehicle: Vehicle,
}

pub async fn seed_fleet(state: &AppState) -> Fleet {
    let (_, Json(city)) = handlers::create_city(
        State(state.clone()),
        Json(CreateCityRequest {
            name: "Lisbon".to_string(),
        }),
    )
    .await
    .unwrap();

    let (_, Json(category)) = handlers::create_category(
        State(state.clone()),
        Json(CreateCategoryRequest {
            name: "Cars".to_string(),
            description: None,
        }),
    )
    .await
    .unwrap();

    let (_, Json(sub_category)) = handlers::create_sub_category(
        State(state.clone()),
        Json(CreateSubCategoryRequest {
            category_id: category.id,
            name: "Compact".to_string(),
            price_per_day: money("50.00"),
        }),
    )
    .await
    .unwrap();

    let vehicle = seed_vehicle(state, &sub_category, &city, "AA-00-AA").await;

    Fleet {
        city,
        sub_category,
        vehicle,
    }
}

pub async fn seed_vehicle(
    state: &AppState,
    sub_category: &SubCategory,
    city: &City,
    plate: &str,
) -> Vehicle {
    let (_, Json(vehicle)) = handlers::create_vehicle(
        State(state.clone()),
        Json(CreateVehicleRequest {
            sub_category_id: sub_category.id,
            city_id: city.id,
            plate_number: plate.to_string(),
            brand: "Renault".to_string(),
            model: "Clio".to_string(),
            year: 2022,
            color: "Blue".to_string(),
        }),
    )
    .await
    .unwrap();
    vehicle
}

pub fn customer_request(city_id: Uuid, email: &str) -> CreateCustomerRequest {
    CreateCustomerRequest {
        first_name: "Ana".to_string(),
        last_name: "Silva".to_string(),
        email: email.to_string(),
        phone: "+351910000000".to_string(),
        national_id: "12345678".to_string(),
        city_id,
    }
}

/// Registers a customer and activates it so it can book.
pub async fn seed_active_customer(state: &AppState, city_id: Uuid) -> Customer {
    let (_, Json(customer)) = handlers::create_customer(
        State(state.clone()),
        Json(customer_request(city_id, "ana@example.com")),
    )
    .await
    .unwrap();
    let Json(customer) = handlers::activate_customer(
        State(state.clone()),
        axum::extract::Path(customer.id),
    )
    .await
    .unwrap();
    customer
}

pub async fn book(
    state: &AppState,
    clerk: &User,
    customer: &Customer,
    vehicle: &Vehicle,
    start: NaiveDate,
    end: NaiveDate,
) -> Order {
    let (_, Json(order)) = handlers::create_order(
        as_auth(clerk),
        State(state.clone()),
        Json(CreateOrderRequest {
            customer_id: customer.id,
            vehicle_id: vehicle.id,
            start_date: start,
            end_date: end,
        }),
    )
    .await
    .unwrap();
    order
}
