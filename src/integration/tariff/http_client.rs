//! Tariff dataset HTTP client.
//! This is the lower level client for the tariff endpoint.
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use super::Result;

/// Hard bound on the fetch, an unresponsive endpoint must not stall a tick.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Plain GET client for the tariff endpoint.
///
/// Deliberately performs no retries: the caller falls back to the last
/// known-good snapshot and the periodic schedule provides natural backoff.
pub struct HttpClient {
    client: Client,
    url: Url,
}

impl HttpClient {
    /// Creates a new instance of `HttpClient`.
    pub fn new(url: Url) -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        HttpClient { client, url }
    }

    /// Fetch the raw tariff dataset.
    pub async fn get_tariffs(&self) -> Result<Value> {
        log::debug!("Fetching tariff dataset from {}", self.url);
        let payload = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(payload)
    }
}
