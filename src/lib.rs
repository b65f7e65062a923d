//! facturenc - Simulate the monthly New-Caledonia electricity bill in Home
//! Assistant from live power sensors.
pub mod billing;
pub mod core;
pub mod integration;
pub mod server;
pub mod services;
