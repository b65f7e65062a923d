//! Tariff Dataset Integration Module
//! The integration is done via a single HTTP JSON endpoint.
mod client;
mod error;
mod http_client;

pub use client::Client;
pub use error::{Error, Result};
