use std::time::Duration;

use gceconfig::Config;
use tracing::debug;
use ureq::Agent;

use crate::errors::GceError;

/// Status code and full body of a GET.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Blocking HTTP GET, the only HTTP verb the gateways need.
pub trait HttpTransport {
    /// Fetches `url`. Non-2xx statuses are replies, not errors.
    fn get(&self, url: &str) -> Result<HttpReply, GceError>;
}

/// [`HttpTransport`] over a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// `timeout` bounds each whole request; `None` keeps ureq's defaults.
    pub fn new(timeout: Option<Duration>) -> Self {
        // 4xx/5xx must not become Error::StatusCode: callers decide what a
        // non-200 means and may still parse the body.
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .into();
        Self { agent }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.get_http_timeout())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpReply, GceError> {
        debug!("GET {}", url);
        let mut response = self.agent.get(url).call().map_err(|source| GceError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|source| GceError::HttpBody {
                url: url.to_string(),
                source,
            })?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(HttpReply { status, body })
    }
}
