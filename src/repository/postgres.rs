use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{
    CustomerFilter, FeeFilter, OrderFilter, Repository, ReservationFilter, TreasuryFilter,
    VehicleFilter,
};
use crate::{
    error::AppResult,
    models::{
        CancellationFeeState, Category, City, CompanyTreasury, Customer, CustomerState,
        DashboardStats, Order, OrderCancellationFee, OrderPayment, OrderState, PaymentState,
        RefreshToken, ReservedVehiclePerDay, ReservedVehicleState, SubCategory, TreasuryBalance,
        User, Vehicle,
    },
};

const USER_COLUMNS: &str = "id, email, full_name, password_hash, role, is_deleted, created_at";
const VEHICLE_COLUMNS: &str = "id, sub_category_id, city_id, plate_number, brand, model, year, color, image_key, is_active, created_at, updated_at";
const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, phone, national_id, city_id, state, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, customer_id, vehicle_id, start_date, end_date, daily_rate, total_amount, state, created_by, created_at, updated_at, cancelled_at";
const PAYMENT_COLUMNS: &str = "id, order_id, amount, method, state, created_at, paid_at, refunded_at";
const FEE_COLUMNS: &str = "id, order_id, amount, state, created_at, settled_at";
const TREASURY_COLUMNS: &str = "id, source, reference_id, amount, description, created_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are checked at runtime; filters are assembled with `QueryBuilder` so every
/// user-supplied value is a bound parameter.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_treasury_entry(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        entry: &CompanyTreasury,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO company_treasury (id, source, reference_id, amount, description, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.source)
        .bind(entry.reference_id)
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

/// Appends ` WHERE ` before the first condition and ` AND ` before the others.
fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, first: &mut bool, sql: &str) {
    builder.push(if *first { " WHERE " } else { " AND " });
    builder.push(sql);
    *first = false;
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS & SESSIONS ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_deleted = false");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_deleted = false"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_email_taken(&self, email: &str) -> AppResult<bool> {
        let (taken,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email.trim().to_lowercase())
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_deleted = false ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn create_user(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, full_name, password_hash, role, is_deleted, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.is_deleted)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// soft_delete_user
    ///
    /// Flags the user and revokes their sessions in one transaction.
    async fn soft_delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("UPDATE users SET is_deleted = true WHERE id = $1 AND is_deleted = false")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;
        if deleted {
            sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(deleted)
    }

    async fn store_refresh_token(&self, token: &RefreshToken) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, revoked, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_refresh_token(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        Ok(sqlx::query_as::<_, RefreshToken>(
            "SELECT token, user_id, expires_at, revoked, created_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn revoke_refresh_token(&self, token: &str) -> AppResult<bool> {
        let res = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE token = $1 AND revoked = false")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- REFERENCE DATA ---

    async fn list_cities(&self) -> AppResult<Vec<City>> {
        Ok(
            sqlx::query_as::<_, City>("SELECT id, name, created_at FROM cities ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_city(&self, id: Uuid) -> AppResult<Option<City>> {
        Ok(
            sqlx::query_as::<_, City>("SELECT id, name, created_at FROM cities WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_city_by_name(&self, name: &str) -> AppResult<Option<City>> {
        Ok(sqlx::query_as::<_, City>(
            "SELECT id, name, created_at FROM cities WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_city(&self, city: &City) -> AppResult<()> {
        sqlx::query("INSERT INTO cities (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(city.id)
            .bind(&city.name)
            .bind(city.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_category(&self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_category(&self, category: &Category) -> AppResult<()> {
        sqlx::query("INSERT INTO categories (id, name, description, created_at) VALUES ($1, $2, $3, $4)")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> AppResult<()> {
        sqlx::query("UPDATE categories SET name = $2, description = $3 WHERE id = $1")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_sub_categories(&self, category_id: Option<Uuid>) -> AppResult<Vec<SubCategory>> {
        Ok(sqlx::query_as::<_, SubCategory>(
            "SELECT id, category_id, name, price_per_day, created_at FROM sub_categories WHERE ($1::uuid IS NULL OR category_id = $1) ORDER BY name",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_sub_category(&self, id: Uuid) -> AppResult<Option<SubCategory>> {
        Ok(sqlx::query_as::<_, SubCategory>(
            "SELECT id, category_id, name, price_per_day, created_at FROM sub_categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_sub_category(&self, sub_category: &SubCategory) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sub_categories (id, category_id, name, price_per_day, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(sub_category.id)
        .bind(sub_category.category_id)
        .bind(&sub_category.name)
        .bind(sub_category.price_per_day)
        .bind(sub_category.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_sub_category(&self, sub_category: &SubCategory) -> AppResult<()> {
        sqlx::query("UPDATE sub_categories SET name = $2, price_per_day = $3 WHERE id = $1")
            .bind(sub_category.id)
            .bind(&sub_category.name)
            .bind(sub_category.price_per_day)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- FLEET ---

    async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {VEHICLE_COLUMNS} FROM vehicles"));
        let mut first = true;
        if let Some(id) = filter.sub_category_id {
            push_condition(&mut builder, &mut first, "sub_category_id = ");
            builder.push_bind(id);
        }
        if let Some(id) = filter.city_id {
            push_condition(&mut builder, &mut first, "city_id = ");
            builder.push_bind(id);
        }
        if let Some(active) = filter.is_active {
            push_condition(&mut builder, &mut first, "is_active = ");
            builder.push_bind(active);
        }
        builder.push(" ORDER BY plate_number");
        Ok(builder
            .build_query_as::<Vehicle>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
        Ok(sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_vehicle_by_plate(&self, plate_number: &str) -> AppResult<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE plate_number = $1");
        Ok(sqlx::query_as::<_, Vehicle>(&sql)
            .bind(plate_number.trim().to_uppercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO vehicles ({VEHICLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        );
        sqlx::query(&sql)
            .bind(vehicle.id)
            .bind(vehicle.sub_category_id)
            .bind(vehicle.city_id)
            .bind(&vehicle.plate_number)
            .bind(&vehicle.brand)
            .bind(&vehicle.model)
            .bind(vehicle.year)
            .bind(&vehicle.color)
            .bind(&vehicle.image_key)
            .bind(vehicle.is_active)
            .bind(vehicle.created_at)
            .bind(vehicle.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE vehicles
            SET sub_category_id = $2, city_id = $3, plate_number = $4, brand = $5, model = $6,
                year = $7, color = $8, image_key = $9, is_active = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(vehicle.id)
        .bind(vehicle.sub_category_id)
        .bind(vehicle.city_id)
        .bind(&vehicle.plate_number)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(&vehicle.color)
        .bind(&vehicle.image_key)
        .bind(vehicle.is_active)
        .bind(vehicle.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- CUSTOMERS ---

    /// list_customers
    ///
    /// Optional state filter plus a case-insensitive search over name, email and phone.
    async fn list_customers(&self, filter: &CustomerFilter) -> AppResult<Vec<Customer>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CUSTOMER_COLUMNS} FROM customers"));
        let mut first = true;
        if let Some(state) = filter.state {
            push_condition(&mut builder, &mut first, "state = ");
            builder.push_bind(state);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            push_condition(&mut builder, &mut first, "(first_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR last_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR email ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR phone ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC");
        Ok(builder
            .build_query_as::<Customer>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_customer(&self, id: Uuid) -> AppResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = $1");
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_customer(&self, customer: &Customer) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO customers ({CUSTOMER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&sql)
            .bind(customer.id)
            .bind(&customer.first_name)
            .bind(&customer.last_name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.national_id)
            .bind(customer.city_id)
            .bind(customer.state)
            .bind(customer.created_at)
            .bind(customer.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE customers
            SET first_name = $2, last_name = $3, email = $4, phone = $5, national_id = $6,
                city_id = $7, state = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.national_id)
        .bind(customer.city_id)
        .bind(customer.state)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- ORDERS & RESERVATIONS ---

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        let mut first = true;
        if let Some(state) = filter.state {
            push_condition(&mut builder, &mut first, "state = ");
            builder.push_bind(state);
        }
        if let Some(id) = filter.customer_id {
            push_condition(&mut builder, &mut first, "customer_id = ");
            builder.push_bind(id);
        }
        if let Some(id) = filter.vehicle_id {
            push_condition(&mut builder, &mut first, "vehicle_id = ");
            builder.push_bind(id);
        }
        if let Some(from) = filter.created_from {
            push_condition(&mut builder, &mut first, "(created_at AT TIME ZONE 'UTC')::date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = filter.created_to {
            push_condition(&mut builder, &mut first, "(created_at AT TIME ZONE 'UTC')::date <= ");
            builder.push_bind(to);
        }
        builder.push(" ORDER BY created_at DESC");
        Ok(builder.build_query_as::<Order>().fetch_all(&self.pool).await?)
    }

    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_order
    ///
    /// Order row and reservation rows share one transaction. A day already held by a
    /// live reservation trips `uq_reserved_vehicle_day` and rolls everything back.
    async fn create_order(&self, order: &Order, days: &[ReservedVehiclePerDay]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        );
        sqlx::query(&sql)
            .bind(order.id)
            .bind(order.customer_id)
            .bind(order.vehicle_id)
            .bind(order.start_date)
            .bind(order.end_date)
            .bind(order.daily_rate)
            .bind(order.total_amount)
            .bind(order.state)
            .bind(order.created_by)
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(order.cancelled_at)
            .execute(&mut *tx)
            .await?;

        if !days.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO reserved_vehicle_per_day (id, vehicle_id, order_id, day, state) ",
            );
            builder.push_values(days, |mut row, day| {
                row.push_bind(day.id)
                    .push_bind(day.vehicle_id)
                    .push_bind(day.order_id)
                    .push_bind(day.day)
                    .push_bind(day.state);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_order(&self, order: &Order, from: OrderState) -> AppResult<bool> {
        let res = sqlx::query(
            "UPDATE orders SET state = $2, updated_at = $3, cancelled_at = $4 WHERE id = $1 AND state = $5",
        )
        .bind(order.id)
        .bind(order.state)
        .bind(order.updated_at)
        .bind(order.cancelled_at)
        .bind(from)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn cancel_order(
        &self,
        order: &Order,
        from: OrderState,
        fee: Option<&OrderCancellationFee>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            "UPDATE orders SET state = $2, updated_at = $3, cancelled_at = $4 WHERE id = $1 AND state = $5",
        )
        .bind(order.id)
        .bind(order.state)
        .bind(order.updated_at)
        .bind(order.cancelled_at)
        .bind(from)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE reserved_vehicle_per_day SET state = $2 WHERE order_id = $1")
            .bind(order.id)
            .bind(ReservedVehicleState::Released)
            .execute(&mut *tx)
            .await?;

        if let Some(fee) = fee {
            let sql = format!(
                "INSERT INTO order_cancellation_fees ({FEE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            );
            sqlx::query(&sql)
                .bind(fee.id)
                .bind(fee.order_id)
                .bind(fee.amount)
                .bind(fee.state)
                .bind(fee.created_at)
                .bind(fee.settled_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn reserved_days(&self, filter: &ReservationFilter) -> AppResult<Vec<ReservedVehiclePerDay>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT r.id, r.vehicle_id, r.order_id, r.day, r.state FROM reserved_vehicle_per_day r JOIN vehicles v ON v.id = r.vehicle_id WHERE r.state = ",
        );
        builder.push_bind(ReservedVehicleState::Reserved);
        builder.push(" AND r.day >= ");
        builder.push_bind(filter.from);
        builder.push(" AND r.day <= ");
        builder.push_bind(filter.to);
        if let Some(id) = filter.vehicle_id {
            builder.push(" AND r.vehicle_id = ");
            builder.push_bind(id);
        }
        if let Some(id) = filter.sub_category_id {
            builder.push(" AND v.sub_category_id = ");
            builder.push_bind(id);
        }
        builder.push(" ORDER BY r.vehicle_id, r.day");
        Ok(builder
            .build_query_as::<ReservedVehiclePerDay>()
            .fetch_all(&self.pool)
            .await?)
    }

    // --- MONEY ---

    async fn list_payments(&self, order_id: Uuid) -> AppResult<Vec<OrderPayment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM order_payments WHERE order_id = $1 ORDER BY created_at"
        );
        Ok(sqlx::query_as::<_, OrderPayment>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_payment(&self, id: Uuid) -> AppResult<Option<OrderPayment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM order_payments WHERE id = $1");
        Ok(sqlx::query_as::<_, OrderPayment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_payment(&self, payment: &OrderPayment) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO order_payments ({PAYMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&sql)
            .bind(payment.id)
            .bind(payment.order_id)
            .bind(payment.amount)
            .bind(&payment.method)
            .bind(payment.state)
            .bind(payment.created_at)
            .bind(payment.paid_at)
            .bind(payment.refunded_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn settle_payment(
        &self,
        payment: &OrderPayment,
        from: PaymentState,
        entry: &CompanyTreasury,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "UPDATE order_payments SET state = $2, paid_at = $3, refunded_at = $4 WHERE id = $1 AND state = $5",
        )
        .bind(payment.id)
        .bind(payment.state)
        .bind(payment.paid_at)
        .bind(payment.refunded_at)
        .bind(from)
        .execute(&mut *tx)
        .await?;
        // Lost the race: dropping the transaction rolls it back, no ledger entry.
        if res.rows_affected() == 0 {
            return Ok(false);
        }
        Self::insert_treasury_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_cancellation_fees(&self, filter: &FeeFilter) -> AppResult<Vec<OrderCancellationFee>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {FEE_COLUMNS} FROM order_cancellation_fees"));
        if let Some(state) = filter.state {
            builder.push(" WHERE state = ");
            builder.push_bind(state);
        }
        builder.push(" ORDER BY created_at DESC");
        Ok(builder
            .build_query_as::<OrderCancellationFee>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_cancellation_fee(&self, id: Uuid) -> AppResult<Option<OrderCancellationFee>> {
        let sql = format!("SELECT {FEE_COLUMNS} FROM order_cancellation_fees WHERE id = $1");
        Ok(sqlx::query_as::<_, OrderCancellationFee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_order_cancellation_fee(&self, order_id: Uuid) -> AppResult<Option<OrderCancellationFee>> {
        let sql = format!("SELECT {FEE_COLUMNS} FROM order_cancellation_fees WHERE order_id = $1");
        Ok(sqlx::query_as::<_, OrderCancellationFee>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn settle_cancellation_fee(
        &self,
        fee: &OrderCancellationFee,
        entry: Option<&CompanyTreasury>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "UPDATE order_cancellation_fees SET state = $2, settled_at = $3 WHERE id = $1 AND state = $4",
        )
        .bind(fee.id)
        .bind(fee.state)
        .bind(fee.settled_at)
        .bind(CancellationFeeState::Unpaid)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Ok(false);
        }
        if let Some(entry) = entry {
            Self::insert_treasury_entry(&mut tx, entry).await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn treasury_balance(&self) -> AppResult<TreasuryBalance> {
        let (balance, entry_count): (Decimal, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0), COUNT(*) FROM company_treasury",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(TreasuryBalance {
            balance,
            entry_count,
        })
    }

    async fn list_treasury_entries(&self, filter: &TreasuryFilter) -> AppResult<Vec<CompanyTreasury>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TREASURY_COLUMNS} FROM company_treasury"));
        let mut first = true;
        if let Some(from) = filter.from {
            push_condition(&mut builder, &mut first, "(created_at AT TIME ZONE 'UTC')::date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = filter.to {
            push_condition(&mut builder, &mut first, "(created_at AT TIME ZONE 'UTC')::date <= ");
            builder.push_bind(to);
        }
        builder.push(" ORDER BY created_at DESC");
        Ok(builder
            .build_query_as::<CompanyTreasury>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// get_stats
    ///
    /// Compiles all dashboard counters in a single round trip.
    async fn get_stats(&self) -> AppResult<DashboardStats> {
        let row: (i64, i64, i64, i64, i64, i64, Decimal) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers),
                (SELECT COUNT(*) FROM customers WHERE state = $1),
                (SELECT COUNT(*) FROM vehicles),
                (SELECT COUNT(*) FROM vehicles WHERE is_active = true),
                (SELECT COUNT(*) FROM orders),
                (SELECT COUNT(*) FROM orders WHERE state IN ($2, $3, $4)),
                (SELECT COALESCE(SUM(amount), 0) FROM company_treasury)
            "#,
        )
        .bind(CustomerState::Active)
        .bind(OrderState::Pending)
        .bind(OrderState::Confirmed)
        .bind(OrderState::InProgress)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_customers: row.0,
            active_customers: row.1,
            total_vehicles: row.2,
            active_vehicles: row.3,
            total_orders: row.4,
            open_orders: row.5,
            treasury_balance: row.6,
        })
    }
}
