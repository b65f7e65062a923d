//! Application configuration loaded from environment variables.
use std::str::FromStr;

use envconfig::Envconfig;
use humantime::Duration;
use reqwest::Url;
use thiserror::Error;

use crate::billing::{Commune, PowerTier, reset::MAX_RESET_DAY};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Buy-back prices offered for exported energy (XPF/kWh).
pub const BUYBACK_PRICE_CHOICES: [f64; 2] = [15.0, 21.0];

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("buy-back price must be one of {BUYBACK_PRICE_CHOICES:?}, got '{0}'")]
    InvalidBuybackPrice(String),
    #[error("reset day must be between 1 and {MAX_RESET_DAY}, got '{0}'")]
    InvalidResetDay(String),
}

/// Buy-back price restricted to the contractual choices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuybackPrice(pub f64);

impl FromStr for BuybackPrice {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<f64>()
            .ok()
            .filter(|price| BUYBACK_PRICE_CHOICES.contains(price))
            .map(BuybackPrice)
            .ok_or_else(|| FieldError::InvalidBuybackPrice(s.to_string()))
    }
}

/// Calendar day-of-month the counters reset on, 1 to 28.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetDay(pub u8);

impl FromStr for ResetDay {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>()
            .ok()
            .filter(|day| (1..=MAX_RESET_DAY).contains(day))
            .map(ResetDay)
            .ok_or_else(|| FieldError::InvalidResetDay(s.to_string()))
    }
}

#[derive(Envconfig)]
pub struct Config {
    #[allow(dead_code)]
    #[envconfig(from = "APP_LOG", default = "error")]
    pub app_log: String,
    #[allow(dead_code)]
    #[envconfig(from = "APP_LOG_STYLE", default = "always")]
    pub app_log_style: String,
    #[envconfig(from = "HOMEASSISTANT_URL")]
    pub homeassistant_url: Url,
    #[envconfig(from = "HOMEASSISTANT_TOKEN")]
    pub homeassistant_token: String,
    #[envconfig(from = "TARIFF_URL")]
    pub tariff_url: Url,
    #[envconfig(from = "COMMUNE")]
    pub commune: Commune,
    #[envconfig(from = "PUISSANCE_KVA")]
    pub puissance: PowerTier,
    #[envconfig(from = "PRIX_RACHAT", default = "15")]
    pub prix_rachat: BuybackPrice,
    #[envconfig(from = "SENSOR_IMPORT")]
    pub sensor_import: String,
    #[envconfig(from = "SENSOR_EXPORT")]
    pub sensor_export: Option<String>,
    #[envconfig(from = "RESET_BUTTON")]
    pub reset_button: Option<String>,
    #[envconfig(from = "RESET_DAY", default = "1")]
    pub reset_day: ResetDay,
    #[envconfig(from = "SYNC_TARIFF_INTERVAL", default = "1h")]
    pub sync_tariff_interval: Duration,
    #[envconfig(from = "SYNC_ENERGY_INTERVAL", default = "30s")]
    pub sync_energy_interval: Duration,
    #[envconfig(from = "SYNC_BILL_INTERVAL", default = "1m")]
    pub sync_bill_interval: Duration,
    #[envconfig(from = "WATCH_RESET_INTERVAL", default = "5s")]
    pub watch_reset_interval: Duration,
}

pub fn configure_logger() {
    let env = env_logger::Env::default()
        .filter_or("APP_LOG", "info")
        .write_style_or("APP_LOG_STYLE", "always");
    env_logger::init_from_env(env);
}
