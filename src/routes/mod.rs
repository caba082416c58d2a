//! Router Module Index
//!
//! Routes are split by access level so that authentication is applied once per group
//! as a layer instead of being remembered handler by handler.

/// Health check and the token endpoints. No authentication.
pub mod public;

/// Day-to-day back-office operations. Any authenticated staff user.
pub mod authenticated;

/// Staff management, money and reports. Nested under `/admin`; each handler
/// additionally requires the `admin` role.
pub mod admin;
