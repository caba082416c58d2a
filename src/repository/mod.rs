use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        CancellationFeeState, Category, City, CompanyTreasury, Customer, CustomerState,
        DashboardStats, Order, OrderCancellationFee, OrderPayment, OrderState, PaymentState,
        RefreshToken, ReservedVehiclePerDay, SubCategory, TreasuryBalance, User, Vehicle,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

// --- Filters ---

/// CustomerFilter
///
/// Query parameters of GET /customers.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CustomerFilter {
    pub state: Option<CustomerState>,
    /// Case-insensitive match on first name, last name, email or phone.
    pub search: Option<String>,
}

/// VehicleFilter
///
/// Query parameters of GET /vehicles.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct VehicleFilter {
    pub sub_category_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// OrderFilter
///
/// Query parameters of GET /orders. The creation-date bounds are inclusive calendar days.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct OrderFilter {
    pub state: Option<OrderState>,
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

/// ReservationFilter
///
/// Selects live (`Reserved`) reservation rows whose day falls in `[from, to]`.
#[derive(Debug, Clone)]
pub struct ReservationFilter {
    pub vehicle_id: Option<Uuid>,
    pub sub_category_id: Option<Uuid>,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// FeeFilter
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct FeeFilter {
    pub state: Option<CancellationFeeState>,
}

/// TreasuryFilter
///
/// Inclusive calendar-day bounds on the entry creation time.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TreasuryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers only see this
/// trait, so the Postgres implementation can be swapped for the in-memory one in
/// tests and demos.
///
/// Every method that writes more than one row (order + reservations, cancellation +
/// release + fee, settlement + ledger entry) is atomic.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & sessions ---
    /// Non-deleted user by id.
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Non-deleted user by (lower-cased) email.
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    /// True if any account holds this (lower-cased) email, deleted ones included.
    async fn user_email_taken(&self, email: &str) -> AppResult<bool>;
    async fn create_user(&self, user: &User) -> AppResult<()>;
    /// Soft delete; also revokes every refresh token of the user. False if absent or already deleted.
    async fn soft_delete_user(&self, id: Uuid) -> AppResult<bool>;

    async fn store_refresh_token(&self, token: &RefreshToken) -> AppResult<()>;
    async fn get_refresh_token(&self, token: &str) -> AppResult<Option<RefreshToken>>;
    /// Returns true if a live token was revoked.
    async fn revoke_refresh_token(&self, token: &str) -> AppResult<bool>;

    // --- Reference data ---
    async fn list_cities(&self) -> AppResult<Vec<City>>;
    async fn get_city(&self, id: Uuid) -> AppResult<Option<City>>;
    async fn find_city_by_name(&self, name: &str) -> AppResult<Option<City>>;
    async fn create_city(&self, city: &City) -> AppResult<()>;

    async fn list_categories(&self) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> AppResult<Option<Category>>;
    async fn create_category(&self, category: &Category) -> AppResult<()>;
    async fn update_category(&self, category: &Category) -> AppResult<()>;

    async fn list_sub_categories(&self, category_id: Option<Uuid>) -> AppResult<Vec<SubCategory>>;
    async fn get_sub_category(&self, id: Uuid) -> AppResult<Option<SubCategory>>;
    async fn create_sub_category(&self, sub_category: &SubCategory) -> AppResult<()>;
    async fn update_sub_category(&self, sub_category: &SubCategory) -> AppResult<()>;

    // --- Fleet ---
    async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>>;
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn find_vehicle_by_plate(&self, plate_number: &str) -> AppResult<Option<Vehicle>>;
    async fn create_vehicle(&self, vehicle: &Vehicle) -> AppResult<()>;
    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<()>;

    // --- Customers ---
    async fn list_customers(&self, filter: &CustomerFilter) -> AppResult<Vec<Customer>>;
    async fn get_customer(&self, id: Uuid) -> AppResult<Option<Customer>>;
    async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>>;
    async fn create_customer(&self, customer: &Customer) -> AppResult<()>;
    async fn update_customer(&self, customer: &Customer) -> AppResult<()>;

    // --- Orders & reservations ---
    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>>;
    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>>;
    /// Inserts the order and its per-day reservations in one transaction.
    async fn create_order(&self, order: &Order, days: &[ReservedVehiclePerDay]) -> AppResult<()>;
    /// Persists a state transition that touches only the order row. False if the stored
    /// order had already left `from`; nothing is written then.
    async fn update_order(&self, order: &Order, from: OrderState) -> AppResult<bool>;
    /// Persists a cancellation: order row, release of its reservations, optional fee.
    /// False (and nothing written) if the stored order had already left `from`.
    async fn cancel_order(
        &self,
        order: &Order,
        from: OrderState,
        fee: Option<&OrderCancellationFee>,
    ) -> AppResult<bool>;

    async fn reserved_days(&self, filter: &ReservationFilter) -> AppResult<Vec<ReservedVehiclePerDay>>;

    // --- Money ---
    async fn list_payments(&self, order_id: Uuid) -> AppResult<Vec<OrderPayment>>;
    async fn get_payment(&self, id: Uuid) -> AppResult<Option<OrderPayment>>;
    async fn create_payment(&self, payment: &OrderPayment) -> AppResult<()>;
    /// Persists a payment state change together with its treasury movement. False if the
    /// stored payment had already left `from`; the ledger is untouched then.
    async fn settle_payment(
        &self,
        payment: &OrderPayment,
        from: PaymentState,
        entry: &CompanyTreasury,
    ) -> AppResult<bool>;

    async fn list_cancellation_fees(&self, filter: &FeeFilter) -> AppResult<Vec<OrderCancellationFee>>;
    async fn get_cancellation_fee(&self, id: Uuid) -> AppResult<Option<OrderCancellationFee>>;
    async fn get_order_cancellation_fee(&self, order_id: Uuid) -> AppResult<Option<OrderCancellationFee>>;
    /// Persists a fee settlement; paid fees carry a treasury credit. False if the stored
    /// fee was already settled.
    async fn settle_cancellation_fee(
        &self,
        fee: &OrderCancellationFee,
        entry: Option<&CompanyTreasury>,
    ) -> AppResult<bool>;

    /// Sum of all ledger entries, computed at read time.
    async fn treasury_balance(&self) -> AppResult<TreasuryBalance>;
    async fn list_treasury_entries(&self, filter: &TreasuryFilter) -> AppResult<Vec<CompanyTreasury>>;

    async fn get_stats(&self) -> AppResult<DashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
