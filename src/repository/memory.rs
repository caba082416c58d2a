//! In-memory repository implementation.
//!
//! Stores every table in a `HashMap` behind one `tokio::sync::RwLock`, so multi-row
//! writes are atomic exactly like their Postgres transactions. Unique constraints of
//! the schema are mirrored. Used by the test-suite and for running the API without a
//! database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CustomerFilter, FeeFilter, OrderFilter, Repository, ReservationFilter, TreasuryFilter,
    VehicleFilter,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        CancellationFeeState, Category, City, CompanyTreasury, Customer, CustomerState,
        DashboardStats, Order, OrderCancellationFee, OrderPayment, OrderState, PaymentState,
        RefreshToken, ReservedVehiclePerDay, ReservedVehicleState, SubCategory, TreasuryBalance,
        User, Vehicle,
    },
};

#[derive(Debug, Default)]
struct Store {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    cities: HashMap<Uuid, City>,
    categories: HashMap<Uuid, Category>,
    sub_categories: HashMap<Uuid, SubCategory>,
    vehicles: HashMap<Uuid, Vehicle>,
    customers: HashMap<Uuid, Customer>,
    orders: HashMap<Uuid, Order>,
    reservations: HashMap<Uuid, ReservedVehiclePerDay>,
    payments: HashMap<Uuid, OrderPayment>,
    fees: HashMap<Uuid, OrderCancellationFee>,
    treasury: HashMap<Uuid, CompanyTreasury>,
}

/// In-memory storage backend.
///
/// Cloning shares the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn within(ts: DateTime<Utc>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    let day = ts.date_naive();
    from.is_none_or(|f| day >= f) && to.is_none_or(|t| day <= t)
}

fn sorted_by<T: Clone, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by_key(|item| key(item));
    out
}

fn newest_first<T: Clone>(
    items: impl Iterator<Item = T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    out
}

fn duplicate(what: &str) -> AppError {
    AppError::conflict(format!("Duplicate value violates unique constraint: {what}"))
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.get(&id).filter(|u| !u.is_deleted).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .find(|u| !u.is_deleted && u.email == email)
            .cloned())
    }

    async fn user_email_taken(&self, email: &str) -> AppResult<bool> {
        let email = email.trim().to_lowercase();
        let store = self.store.read().await;
        Ok(store.users.values().any(|u| u.email == email))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(newest_first(
            store.users.values().filter(|u| !u.is_deleted).cloned(),
            |u| u.created_at,
        ))
    }

    async fn create_user(&self, user: &User) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(duplicate("users_email_key"));
        }
        store.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn soft_delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.users.get_mut(&id) {
            Some(user) if !user.is_deleted => user.is_deleted = true,
            _ => return Ok(false),
        }
        store
            .refresh_tokens
            .values_mut()
            .filter(|t| t.user_id == id)
            .for_each(|t| t.revoked = true);
        Ok(true)
    }

    async fn store_refresh_token(&self, token: &RefreshToken) -> AppResult<()> {
        let mut store = self.store.write().await;
        store.refresh_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_refresh_token(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        let store = self.store.read().await;
        Ok(store.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.refresh_tokens.get_mut(token) {
            Some(t) if !t.revoked => {
                t.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_cities(&self) -> AppResult<Vec<City>> {
        let store = self.store.read().await;
        Ok(sorted_by(store.cities.values().cloned(), |c| c.name.clone()))
    }

    async fn get_city(&self, id: Uuid) -> AppResult<Option<City>> {
        Ok(self.store.read().await.cities.get(&id).cloned())
    }

    async fn find_city_by_name(&self, name: &str) -> AppResult<Option<City>> {
        let name = name.trim().to_lowercase();
        let store = self.store.read().await;
        Ok(store
            .cities
            .values()
            .find(|c| c.name.to_lowercase() == name)
            .cloned())
    }

    async fn create_city(&self, city: &City) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.cities.values().any(|c| c.name == city.name) {
            return Err(duplicate("cities_name_key"));
        }
        store.cities.insert(city.id, city.clone());
        Ok(())
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let store = self.store.read().await;
        Ok(sorted_by(store.categories.values().cloned(), |c| c.name.clone()))
    }

    async fn get_category(&self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(self.store.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, category: &Category) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.categories.values().any(|c| c.name == category.name) {
            return Err(duplicate("categories_name_key"));
        }
        store.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store
            .categories
            .values()
            .any(|c| c.id != category.id && c.name == category.name)
        {
            return Err(duplicate("categories_name_key"));
        }
        store.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn list_sub_categories(&self, category_id: Option<Uuid>) -> AppResult<Vec<SubCategory>> {
        let store = self.store.read().await;
        Ok(sorted_by(
            store
                .sub_categories
                .values()
                .filter(|s| category_id.is_none_or(|id| s.category_id == id))
                .cloned(),
            |s| s.name.clone(),
        ))
    }

    async fn get_sub_category(&self, id: Uuid) -> AppResult<Option<SubCategory>> {
        Ok(self.store.read().await.sub_categories.get(&id).cloned())
    }

    async fn create_sub_category(&self, sub_category: &SubCategory) -> AppResult<()> {
        let mut store = self.store.write().await;
        store.sub_categories.insert(sub_category.id, sub_category.clone());
        Ok(())
    }

    async fn update_sub_category(&self, sub_category: &SubCategory) -> AppResult<()> {
        self.create_sub_category(sub_category).await
    }

    async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        let store = self.store.read().await;
        Ok(sorted_by(
            store
                .vehicles
                .values()
                .filter(|v| filter.sub_category_id.is_none_or(|id| v.sub_category_id == id))
                .filter(|v| filter.city_id.is_none_or(|id| v.city_id == id))
                .filter(|v| filter.is_active.is_none_or(|active| v.is_active == active))
                .cloned(),
            |v| v.plate_number.clone(),
        ))
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.store.read().await.vehicles.get(&id).cloned())
    }

    async fn find_vehicle_by_plate(&self, plate_number: &str) -> AppResult<Option<Vehicle>> {
        let plate = plate_number.trim().to_uppercase();
        let store = self.store.read().await;
        Ok(store
            .vehicles
            .values()
            .find(|v| v.plate_number == plate)
            .cloned())
    }

    async fn create_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store
            .vehicles
            .values()
            .any(|v| v.id != vehicle.id && v.plate_number == vehicle.plate_number)
        {
            return Err(duplicate("vehicles_plate_number_key"));
        }
        store.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        self.create_vehicle(vehicle).await
    }

    async fn list_customers(&self, filter: &CustomerFilter) -> AppResult<Vec<Customer>> {
        let store = self.store.read().await;
        Ok(newest_first(
            store
                .customers
                .values()
                .filter(|c| filter.state.is_none_or(|s| c.state == s))
                .filter(|c| filter.search.as_deref().is_none_or(|needle| c.matches(needle)))
                .cloned(),
            |c| c.created_at,
        ))
    }

    async fn get_customer(&self, id: Uuid) -> AppResult<Option<Customer>> {
        Ok(self.store.read().await.customers.get(&id).cloned())
    }

    async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        let email = email.trim().to_lowercase();
        let store = self.store.read().await;
        Ok(store.customers.values().find(|c| c.email == email).cloned())
    }

    async fn create_customer(&self, customer: &Customer) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store
            .customers
            .values()
            .any(|c| c.id != customer.id && c.email == customer.email)
        {
            return Err(duplicate("customers_email_key"));
        }
        store.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> AppResult<()> {
        self.create_customer(customer).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let store = self.store.read().await;
        Ok(newest_first(
            store
                .orders
                .values()
                .filter(|o| filter.state.is_none_or(|s| o.state == s))
                .filter(|o| filter.customer_id.is_none_or(|id| o.customer_id == id))
                .filter(|o| filter.vehicle_id.is_none_or(|id| o.vehicle_id == id))
                .filter(|o| within(o.created_at, filter.created_from, filter.created_to))
                .cloned(),
            |o| o.created_at,
        ))
    }

    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.store.read().await.orders.get(&id).cloned())
    }

    async fn create_order(&self, order: &Order, days: &[ReservedVehiclePerDay]) -> AppResult<()> {
        let mut store = self.store.write().await;
        let clash = days.iter().any(|day| {
            store.reservations.values().any(|r| {
                r.state == ReservedVehicleState::Reserved
                    && r.vehicle_id == day.vehicle_id
                    && r.day == day.day
            })
        });
        if clash {
            return Err(AppError::conflict(
                "Vehicle is already reserved for the selected dates",
            ));
        }
        store.orders.insert(order.id, order.clone());
        for day in days {
            store.reservations.insert(day.id, day.clone());
        }
        Ok(())
    }

    async fn update_order(&self, order: &Order, from: OrderState) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.orders.get_mut(&order.id) {
            Some(stored) if stored.state == from => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_order(
        &self,
        order: &Order,
        from: OrderState,
        fee: Option<&OrderCancellationFee>,
    ) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store.orders.get(&order.id).is_some_and(|o| o.state == from) {
            return Ok(false);
        }
        if let Some(fee) = fee {
            if store.fees.values().any(|f| f.order_id == fee.order_id) {
                return Err(duplicate("order_cancellation_fees_order_id_key"));
            }
            store.fees.insert(fee.id, fee.clone());
        }
        store.orders.insert(order.id, order.clone());
        store
            .reservations
            .values_mut()
            .filter(|r| r.order_id == order.id)
            .for_each(|r| r.state = ReservedVehicleState::Released);
        Ok(true)
    }

    async fn reserved_days(&self, filter: &ReservationFilter) -> AppResult<Vec<ReservedVehiclePerDay>> {
        let store = self.store.read().await;
        let in_sub_category = |vehicle_id: Uuid| match filter.sub_category_id {
            None => true,
            Some(sub) => store
                .vehicles
                .get(&vehicle_id)
                .is_some_and(|v| v.sub_category_id == sub),
        };
        Ok(sorted_by(
            store
                .reservations
                .values()
                .filter(|r| r.state == ReservedVehicleState::Reserved)
                .filter(|r| r.day >= filter.from && r.day <= filter.to)
                .filter(|r| filter.vehicle_id.is_none_or(|id| r.vehicle_id == id))
                .filter(|r| in_sub_category(r.vehicle_id))
                .cloned(),
            |r| (r.vehicle_id, r.day),
        ))
    }

    async fn list_payments(&self, order_id: Uuid) -> AppResult<Vec<OrderPayment>> {
        let store = self.store.read().await;
        Ok(sorted_by(
            store
                .payments
                .values()
                .filter(|p| p.order_id == order_id)
                .cloned(),
            |p| p.created_at,
        ))
    }

    async fn get_payment(&self, id: Uuid) -> AppResult<Option<OrderPayment>> {
        Ok(self.store.read().await.payments.get(&id).cloned())
    }

    async fn create_payment(&self, payment: &OrderPayment) -> AppResult<()> {
        let mut store = self.store.write().await;
        store.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn settle_payment(
        &self,
        payment: &OrderPayment,
        from: PaymentState,
        entry: &CompanyTreasury,
    ) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.payments.get_mut(&payment.id) {
            Some(stored) if stored.state == from => *stored = payment.clone(),
            _ => return Ok(false),
        }
        store.treasury.insert(entry.id, entry.clone());
        Ok(true)
    }

    async fn list_cancellation_fees(&self, filter: &FeeFilter) -> AppResult<Vec<OrderCancellationFee>> {
        let store = self.store.read().await;
        Ok(newest_first(
            store
                .fees
                .values()
                .filter(|f| filter.state.is_none_or(|s| f.state == s))
                .cloned(),
            |f| f.created_at,
        ))
    }

    async fn get_cancellation_fee(&self, id: Uuid) -> AppResult<Option<OrderCancellationFee>> {
        Ok(self.store.read().await.fees.get(&id).cloned())
    }

    async fn get_order_cancellation_fee(&self, order_id: Uuid) -> AppResult<Option<OrderCancellationFee>> {
        let store = self.store.read().await;
        Ok(store.fees.values().find(|f| f.order_id == order_id).cloned())
    }

    async fn settle_cancellation_fee(
        &self,
        fee: &OrderCancellationFee,
        entry: Option<&CompanyTreasury>,
    ) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.fees.get_mut(&fee.id) {
            Some(stored) if stored.state == CancellationFeeState::Unpaid => *stored = fee.clone(),
            _ => return Ok(false),
        }
        if let Some(entry) = entry {
            store.treasury.insert(entry.id, entry.clone());
        }
        Ok(true)
    }

    async fn treasury_balance(&self) -> AppResult<TreasuryBalance> {
        let store = self.store.read().await;
        Ok(TreasuryBalance {
            balance: store.treasury.values().map(|e| e.amount).sum(),
            entry_count: store.treasury.len() as i64,
        })
    }

    async fn list_treasury_entries(&self, filter: &TreasuryFilter) -> AppResult<Vec<CompanyTreasury>> {
        let store = self.store.read().await;
        Ok(newest_first(
            store
                .treasury
                .values()
                .filter(|e| within(e.created_at, filter.from, filter.to))
                .cloned(),
            |e| e.created_at,
        ))
    }

    async fn get_stats(&self) -> AppResult<DashboardStats> {
        let store = self.store.read().await;
        let count = |n: usize| n as i64;
        Ok(DashboardStats {
            total_customers: count(store.customers.len()),
            active_customers: count(
                store
                    .customers
                    .values()
                    .filter(|c| c.state == CustomerState::Active)
                    .count(),
            ),
            total_vehicles: count(store.vehicles.len()),
            active_vehicles: count(store.vehicles.values().filter(|v| v.is_active).count()),
            total_orders: count(store.orders.len()),
            open_orders: count(store.orders.values().filter(|o| o.state.is_open()).count()),
            treasury_balance: store
                .treasury
                .values()
                .map(|e| e.amount)
                .sum::<Decimal>(),
        })
    }
}
