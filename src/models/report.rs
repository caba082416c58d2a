use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::OrderState;

// --- Revenue ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub net: Decimal,
}

/// RevenueReport
///
/// Treasury movements inside the window, split by source.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RevenueReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub payments_total: Decimal,
    /// Absolute value of refunded payments.
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub refunds_total: Decimal,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub cancellation_fees_total: Decimal,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub net_revenue: Decimal,
    pub by_month: Vec<MonthlyRevenue>,
}

// --- Cancellations ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CancellationReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_orders: i64,
    pub cancelled_orders: i64,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub cancellation_rate: Decimal,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub fees_paid: Decimal,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub fees_waived: Decimal,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub fees_unpaid: Decimal,
}

// --- Utilization ---

/// UtilizationQuery
///
/// Query parameters of GET /admin/reports/vehicles.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct UtilizationQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub sub_category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct VehicleUtilization {
    pub vehicle_id: Uuid,
    pub plate_number: String,
    pub reserved_days: i64,
    pub total_days: i64,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub utilization_percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VehicleUtilizationReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub vehicles: Vec<VehicleUtilization>,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub average_utilization_percent: Decimal,
}

// --- Order states ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct OrderStateCount {
    pub state: OrderState,
    pub count: i64,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderStateReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_orders: i64,
    pub states: Vec<OrderStateCount>,
}

// --- Dashboard ---

/// DashboardStats
///
/// Output schema for the administrative dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_customers: i64,
    pub active_customers: i64,
    pub total_vehicles: i64,
    pub active_vehicles: i64,
    pub total_orders: i64,
    /// Pending, confirmed and in-progress orders.
    pub open_orders: i64,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub treasury_balance: Decimal,
}
