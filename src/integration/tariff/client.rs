//! Tariff dataset client.
//! This client is the higher level API client for the tariff endpoint.
use std::collections::HashMap;

use serde_json::Value;

use super::http_client::HttpClient;
use super::{Error, Result};
use crate::billing::{PowerTier, TariffConstants};
use reqwest::Url;

static METERING_FEE: &str = "redevance_comptage";
static GENERAL_TAX_RATE: &str = "taux_tgc";
static COMMUNAL_TAXES: &str = "taxes";

pub struct Client {
    http: HttpClient,
}

impl Client {
    /// Creates a new instance of `Client`.
    pub fn new(url: Url) -> Self {
        let http = HttpClient::new(url);
        Client { http }
    }

    /// Fetch the tariff constants for the given tier.
    ///
    /// Fails when the endpoint is unreachable, times out, or the payload is
    /// missing required keys. A failed fetch never touches a previously
    /// returned snapshot, the caller keeps the stale value.
    pub async fn fetch(&self, tier: PowerTier) -> Result<TariffConstants> {
        let payload = self.http.get_tariffs().await?;
        Self::extract_constants(&payload, tier)
    }

    /// Extract the full constant set from the dataset payload.
    fn extract_constants(payload: &Value, tier: PowerTier) -> Result<TariffConstants> {
        let (fixed_charge, purchase_price) = Self::extract_tier_prices(payload, tier)?;
        Ok(TariffConstants {
            fixed_charge,
            purchase_price,
            metering_fee: Self::extract_amount(payload, METERING_FEE)?,
            general_tax_rate: Self::extract_rate(payload, GENERAL_TAX_RATE)?,
            communal_tax_rates: Self::extract_communal_taxes(payload)?,
        })
    }

    /// Extract the `[fixed_charge, purchase_price]` pair of a tier.
    fn extract_tier_prices(payload: &Value, tier: PowerTier) -> Result<(f64, f64)> {
        let key = tier.to_string();
        let pair = payload
            .get(&key)
            .and_then(Value::as_array)
            .ok_or_else(|| Error::PayloadKeyMissing(key.clone()))?;
        let fixed_charge = pair
            .first()
            .and_then(Self::value_as_f64)
            .filter(|v| *v >= 0.0)
            .ok_or_else(|| Error::PayloadValueInvalid(format!("{key}[0]")))?;
        let purchase_price = pair
            .get(1)
            .and_then(Self::value_as_f64)
            .filter(|v| *v >= 0.0)
            .ok_or_else(|| Error::PayloadValueInvalid(format!("{key}[1]")))?;
        Ok((fixed_charge, purchase_price))
    }

    /// Extract a non-negative amount.
    fn extract_amount(payload: &Value, key: &str) -> Result<f64> {
        let value = payload
            .get(key)
            .ok_or_else(|| Error::PayloadKeyMissing(key.to_string()))?;
        Self::value_as_f64(value)
            .filter(|v| *v >= 0.0)
            .ok_or_else(|| Error::PayloadValueInvalid(key.to_string()))
    }

    /// Extract a tax rate, a fraction in `[0, 1]`.
    fn extract_rate(payload: &Value, key: &str) -> Result<f64> {
        let value = payload
            .get(key)
            .ok_or_else(|| Error::PayloadKeyMissing(key.to_string()))?;
        Self::value_as_f64(value)
            .filter(|v| (0.0..=1.0).contains(v))
            .ok_or_else(|| Error::PayloadValueInvalid(key.to_string()))
    }

    /// Extract the per-municipality tax rate map.
    ///
    /// The map is carried wholesale, a commune missing from it is resolved
    /// to rate 0 at lookup time, not here.
    fn extract_communal_taxes(payload: &Value) -> Result<HashMap<String, f64>> {
        let taxes = payload
            .get(COMMUNAL_TAXES)
            .ok_or_else(|| Error::PayloadKeyMissing(COMMUNAL_TAXES.to_string()))?
            .as_object()
            .ok_or_else(|| Error::PayloadValueInvalid(COMMUNAL_TAXES.to_string()))?;
        taxes
            .iter()
            .map(|(commune, value)| {
                let rate = Self::value_as_f64(value)
                    .filter(|v| (0.0..=1.0).contains(v))
                    .ok_or_else(|| {
                        Error::PayloadValueInvalid(format!("{COMMUNAL_TAXES}.{commune}"))
                    })?;
                Ok((commune.clone(), rate))
            })
            .collect()
    }

    /// Dataset values may be numbers or numeric strings.
    fn value_as_f64(value: &Value) -> Option<f64> {
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }
}
