use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// ReservedVehicleState
///
/// A reservation is `Released` when its order is cancelled. Completed rentals keep
/// their rows `Reserved`; they are the history behind the utilization report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[repr(i32)]
#[ts(export)]
pub enum ReservedVehicleState {
    #[default]
    Reserved = 0,
    Released = 1,
}

/// ReservedVehiclePerDay
///
/// One vehicle blocked for one calendar day by one order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ReservedVehiclePerDay {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub order_id: Uuid,
    pub day: NaiveDate,
    pub state: ReservedVehicleState,
}

impl ReservedVehiclePerDay {
    pub fn new(vehicle_id: Uuid, order_id: Uuid, day: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            order_id,
            day,
            state: ReservedVehicleState::Reserved,
        }
    }
}

/// expand_days
///
/// Every calendar day in `[start, end]`, in order. Empty when `end < start`.
pub fn expand_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |day| day.checked_add_days(Days::new(1)))
        .take_while(move |day| *day <= end)
}

/// DateRange
///
/// Inclusive `from`/`to` query window shared by the reservation lookup and the reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, IntoParams, TS)]
#[ts(export)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> AppResult<Self> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.to < self.from {
            return Err(AppError::bad_request("Invalid date range"));
        }
        Ok(())
    }

    /// Number of calendar days in the window, both ends included.
    pub fn total_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }

    /// Clips `[start, end]` to the window and returns the overlapping days.
    pub fn overlap(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        expand_days(start.max(self.from), end.min(self.to))
    }
}

/// ReservationQuery
///
/// Query parameters of GET /reservations: which sub-category, over which window.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ReservationQuery {
    pub sub_category_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// VehicleBookedDays
///
/// The booked calendar days of one vehicle inside the requested window.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct VehicleBookedDays {
    pub vehicle_id: Uuid,
    pub plate_number: String,
    pub booked_days: Vec<NaiveDate>,
}

/// booked_days
///
/// Collapses reservation rows into the sorted, de-duplicated set of `Reserved` days
/// that fall inside `range`.
pub fn booked_days<'a>(
    rows: impl IntoIterator<Item = &'a ReservedVehiclePerDay>,
    range: &DateRange,
) -> Vec<NaiveDate> {
    rows.into_iter()
        .filter(|r| r.state == ReservedVehicleState::Reserved && range.contains(r.day))
        .map(|r| r.day)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
