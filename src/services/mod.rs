//! Background services.
pub mod billing;

pub use billing::{BillingBackgroundService, BillingSettings};
