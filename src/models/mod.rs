//! Persistence records, request payloads and response DTOs.
//!
//! Entities are created through a `new` factory and mutated through small
//! state-gated methods; the handlers persist whatever those methods produce.

pub mod customer;
pub mod fleet;
pub mod order;
pub mod report;
pub mod reservation;
pub mod user;

pub use customer::*;
pub use fleet::*;
pub use order::*;
pub use report::*;
pub use reservation::*;
pub use user::*;

use rust_decimal::Decimal;

/// Rounds a monetary or percentage value to two decimal places, half away from zero
/// (0.125 becomes 0.13).
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the percentage `part / whole * 100`, rounded to two decimals; zero when `whole` is zero.
pub fn percent_of(part: i64, whole: i64) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    round2(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}
