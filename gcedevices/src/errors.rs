use thiserror::Error;

use crate::teleinfo_parser::ExtractError;

#[derive(Error, Debug)]
pub enum GceError {
    #[error("Discovery socket error: {0}")]
    Discovery(#[source] std::io::Error),
    #[error("Invalid discovery options: {0}")]
    InvalidDiscoveryOptions(String),
    #[error("HTTP request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("Failed to read HTTP body from {url}: {source}")]
    HttpBody {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("XML parsing error: {0}")]
    Xml(#[from] ExtractError),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} did not return a JSON object")]
    NotAnObject(String),
    #[error("Invalid teleinfo channel {0} (expected 1 or 2)")]
    InvalidChannel(u8),
    #[error("Invalid device address '{0}' (expected IPv4:port)")]
    InvalidDeviceAddress(String),
}

impl GceError {
    pub fn invalid_discovery_options(message: &str) -> Self {
        GceError::InvalidDiscoveryOptions(message.to_string())
    }
}
