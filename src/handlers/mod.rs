//! One axum handler per operation.
//!
//! Every handler follows the same shape: load one or two entities through the
//! repository, let the entity's own method enforce its state gate, persist the
//! result and return the DTO. Failures travel as `AppError`.

pub mod auth;
pub mod catalog;
pub mod customers;
pub mod dashboard;
pub mod fees;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod reservations;
pub mod treasury;
pub mod users;
pub mod vehicles;

pub use auth::*;
pub use catalog::*;
pub use customers::*;
pub use dashboard::*;
pub use fees::*;
pub use orders::*;
pub use payments::*;
pub use reports::*;
pub use reservations::*;
pub use treasury::*;
pub use users::*;
pub use vehicles::*;

use crate::error::{AppError, AppResult};

/// Turns a repository lookup miss into a 404 carrying `msg`.
pub(crate) fn found<T>(value: Option<T>, msg: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::not_found(msg))
}

/// Turns a state-guarded write that matched no row into the 422 the entity's gate raises.
pub(crate) fn applied(written: bool, msg: &str) -> AppResult<()> {
    if written {
        Ok(())
    } else {
        Err(AppError::invalid_state(msg))
    }
}
