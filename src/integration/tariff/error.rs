//! Error handling for the tariff dataset client.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Payload key missing: {0}")]
    PayloadKeyMissing(String),
    #[error("Payload value invalid: {0}")]
    PayloadValueInvalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
