use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{ReservedVehiclePerDay, expand_days, round2};
use crate::error::{AppError, AppResult};

// --- Orders ---

/// OrderState
///
/// Pending → Confirmed → InProgress (vehicle picked up) → Completed (vehicle returned).
/// Pending and Confirmed orders may be Cancelled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[repr(i32)]
#[ts(export)]
pub enum OrderState {
    #[default]
    Pending = 0,
    Confirmed = 1,
    InProgress = 2,
    Completed = 3,
    Cancelled = 4,
}

impl OrderState {
    pub const ALL: [OrderState; 5] = [
        OrderState::Pending,
        OrderState::Confirmed,
        OrderState::InProgress,
        OrderState::Completed,
        OrderState::Cancelled,
    ];

    /// Orders that still hold the vehicle.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            OrderState::Pending | OrderState::Confirmed | OrderState::InProgress
        )
    }
}

/// Order
///
/// A rental of one vehicle by one customer over an inclusive range of calendar days.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub daily_rate: Decimal,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub state: OrderState,
    // Staff user who booked the order.
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Longest bookable rental, counting both ends.
pub const MAX_RENTAL_DAYS: i64 = 365;

impl Order {
    /// new
    ///
    /// Prices the rental (`daily_rate` × inclusive day count) and rejects inverted or
    /// over-long ranges.
    pub fn new(
        customer_id: Uuid,
        vehicle_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        daily_rate: Decimal,
        created_by: Uuid,
    ) -> AppResult<Self> {
        Self::check_range(start_date, end_date)?;
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::new_v4(),
            customer_id,
            vehicle_id,
            start_date,
            end_date,
            daily_rate,
            total_amount: Decimal::ZERO,
            state: OrderState::Pending,
            created_by,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        order.total_amount = round2(daily_rate * Decimal::from(order.rental_days()));
        Ok(order)
    }

    /// Rejects an inverted range or one longer than [`MAX_RENTAL_DAYS`].
    pub fn check_range(start_date: NaiveDate, end_date: NaiveDate) -> AppResult<()> {
        if end_date < start_date {
            return Err(AppError::bad_request(
                "End date must not be before start date",
            ));
        }
        if (end_date - start_date).num_days() >= MAX_RENTAL_DAYS {
            return Err(AppError::bad_request(format!(
                "Rental cannot exceed {MAX_RENTAL_DAYS} days"
            )));
        }
        Ok(())
    }

    /// Number of billed days; both the pick-up and the return day count.
    pub fn rental_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// One reservation row per calendar day of the rental.
    pub fn reservations(&self) -> Vec<ReservedVehiclePerDay> {
        expand_days(self.start_date, self.end_date)
            .map(|day| ReservedVehiclePerDay::new(self.vehicle_id, self.id, day))
            .collect()
    }

    pub fn confirm(&mut self) -> AppResult<()> {
        self.transition(
            OrderState::Pending,
            OrderState::Confirmed,
            "Only pending orders can be confirmed",
        )
    }

    pub fn start(&mut self) -> AppResult<()> {
        self.transition(
            OrderState::Confirmed,
            OrderState::InProgress,
            "Only confirmed orders can be started",
        )
    }

    pub fn complete(&mut self) -> AppResult<()> {
        self.transition(
            OrderState::InProgress,
            OrderState::Completed,
            "Only orders in progress can be completed",
        )
    }

    /// cancel
    ///
    /// Cancels a pending or confirmed order. A confirmed order owes a fee of
    /// `fee_percent` of its total, returned for the caller to persist alongside.
    pub fn cancel(&mut self, fee_percent: Decimal) -> AppResult<Option<OrderCancellationFee>> {
        let was = self.state;
        if !matches!(was, OrderState::Pending | OrderState::Confirmed) {
            return Err(AppError::invalid_state(
                "Order cannot be cancelled in its current state",
            ));
        }
        let now = Utc::now();
        self.state = OrderState::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;

        if was == OrderState::Confirmed && fee_percent > Decimal::ZERO {
            let amount = round2(self.total_amount * fee_percent / Decimal::ONE_HUNDRED);
            return Ok(Some(OrderCancellationFee::new(self.id, amount)));
        }
        Ok(None)
    }

    fn transition(&mut self, from: OrderState, to: OrderState, message: &str) -> AppResult<()> {
        if self.state != from {
            return Err(AppError::invalid_state(message));
        }
        self.state = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// CreateOrderRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// OrderDetails
///
/// Order view for the detail screen, with its money trail.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderDetails {
    pub order: Order,
    pub rental_days: i64,
    pub payments: Vec<OrderPayment>,
    pub cancellation_fee: Option<OrderCancellationFee>,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub amount_paid: Decimal,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub outstanding: Decimal,
}

impl OrderDetails {
    pub fn new(
        order: Order,
        payments: Vec<OrderPayment>,
        cancellation_fee: Option<OrderCancellationFee>,
    ) -> Self {
        let amount_paid: Decimal = payments
            .iter()
            .filter(|p| p.state == PaymentState::Paid)
            .map(|p| p.amount)
            .sum();
        let outstanding = if order.state == OrderState::Cancelled {
            Decimal::ZERO
        } else {
            (order.total_amount - amount_paid).max(Decimal::ZERO)
        };
        Self {
            rental_days: order.rental_days(),
            order,
            payments,
            cancellation_fee,
            amount_paid,
            outstanding,
        }
    }
}

// --- Payments ---

/// PaymentState
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[repr(i32)]
#[ts(export)]
pub enum PaymentState {
    #[default]
    Pending = 0,
    Paid = 1,
    Refunded = 2,
}

/// OrderPayment
///
/// A payment against an order. Money only reaches the treasury once the payment is
/// confirmed as Paid.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct OrderPayment {
    pub id: Uuid,
    pub order_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub amount: Decimal,
    // Free-form: "card", "cash", "transfer".
    pub method: String,
    pub state: PaymentState,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub refunded_at: Option<DateTime<Utc>>,
}

impl OrderPayment {
    /// new
    ///
    /// `committed` is the sum of the order's pending and paid payments so far.
    pub fn new(order: &Order, committed: Decimal, req: CreatePaymentRequest) -> AppResult<Self> {
        if order.state == OrderState::Cancelled {
            return Err(AppError::invalid_state(
                "Cannot add a payment to a cancelled order",
            ));
        }
        let amount = round2(req.amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::bad_request(
                "Payment amount must be greater than zero",
            ));
        }
        if committed + amount > order.total_amount {
            return Err(AppError::bad_request(
                "Payment exceeds the outstanding balance",
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            amount,
            method: req.method,
            state: PaymentState::Pending,
            created_at: Utc::now(),
            paid_at: None,
            refunded_at: None,
        })
    }

    /// Marks the payment Paid and returns the treasury credit to record with it.
    pub fn confirm(&mut self) -> AppResult<CompanyTreasury> {
        if self.state != PaymentState::Pending {
            return Err(AppError::invalid_state(
                "Only pending payments can be confirmed",
            ));
        }
        self.state = PaymentState::Paid;
        self.paid_at = Some(Utc::now());
        Ok(CompanyTreasury::new(
            TreasurySource::OrderPayment,
            self.id,
            self.amount,
            format!("Payment for order {}", self.order_id),
        ))
    }

    /// Marks the payment Refunded and returns the treasury debit to record with it.
    pub fn refund(&mut self) -> AppResult<CompanyTreasury> {
        if self.state != PaymentState::Paid {
            return Err(AppError::invalid_state(
                "Only paid payments can be refunded",
            ));
        }
        self.state = PaymentState::Refunded;
        self.refunded_at = Some(Utc::now());
        Ok(CompanyTreasury::new(
            TreasurySource::PaymentRefund,
            self.id,
            -self.amount,
            format!("Refund for order {}", self.order_id),
        ))
    }
}

/// CreatePaymentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreatePaymentRequest {
    #[ts(type = "string")]
    #[schema(value_type = String, example = "150.00")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 30))]
    #[schema(example = "card")]
    pub method: String,
}

// --- Cancellation fees ---

/// CancellationFeeState
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[repr(i32)]
#[ts(export)]
pub enum CancellationFeeState {
    #[default]
    Unpaid = 0,
    Paid = 1,
    Waived = 2,
}

/// OrderCancellationFee
///
/// Charged when a confirmed order is cancelled. At most one per order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct OrderCancellationFee {
    pub id: Uuid,
    pub order_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub state: CancellationFeeState,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl OrderCancellationFee {
    pub fn new(order_id: Uuid, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount,
            state: CancellationFeeState::Unpaid,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    pub fn pay(&mut self) -> AppResult<CompanyTreasury> {
        self.settle(CancellationFeeState::Paid)?;
        Ok(CompanyTreasury::new(
            TreasurySource::CancellationFee,
            self.id,
            self.amount,
            format!("Cancellation fee for order {}", self.order_id),
        ))
    }

    pub fn waive(&mut self) -> AppResult<()> {
        self.settle(CancellationFeeState::Waived)
    }

    fn settle(&mut self, to: CancellationFeeState) -> AppResult<()> {
        if self.state != CancellationFeeState::Unpaid {
            return Err(AppError::invalid_state(
                "Cancellation fee is already settled",
            ));
        }
        self.state = to;
        self.settled_at = Some(Utc::now());
        Ok(())
    }
}

// --- Treasury ---

/// TreasurySource
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[repr(i32)]
#[ts(export)]
pub enum TreasurySource {
    OrderPayment = 0,
    PaymentRefund = 1,
    CancellationFee = 2,
}

/// CompanyTreasury
///
/// One signed ledger movement. The company balance is the sum of all entries and is
/// recomputed on every read; nothing caches it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct CompanyTreasury {
    pub id: Uuid,
    pub source: TreasurySource,
    // Payment or cancellation fee that produced the movement.
    pub reference_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl CompanyTreasury {
    pub fn new(source: TreasurySource, reference_id: Uuid, amount: Decimal, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            reference_id,
            amount,
            description,
            created_at: Utc::now(),
        }
    }
}

/// TreasuryBalance
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TreasuryBalance {
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub entry_count: i64,
}
