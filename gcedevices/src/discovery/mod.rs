//! # Eco-Devices discovery
//!
//! GCE Electronics gateways answer a fixed UDP broadcast on port 30303 with
//! a short CRLF-delimited text reply:
//!
//! ```text
//! ECO-DEVICES\r\n
//! 00:04:A3:12:34:56\r\n
//! 80\r\n
//! ```
//!
//! The sender address of the reply is the device address.
//!
//! ## Timing
//!
//! The time budget is cut into poll slices (100 ms by default). Every slice
//! waits for at most one datagram, so `duration / poll_interval` rounded up
//! is the maximum number of replies a wildcard search can collect.

mod client;

use std::net::SocketAddr;
use std::time::Duration;

use gceconfig::Config;

use crate::errors::GceError;

pub use client::{discover, discover_first, parse_reply};

/// Payload broadcast to trigger the replies
pub const DISCOVERY_PAYLOAD: &[u8] = b"Discover GCE Devices";

/// UDP port the gateways listen on
pub const DISCOVERY_PORT: u16 = gceconfig::DEFAULT_DISCOVERY_PORT;

/// Largest reply read from a single datagram
pub const RECV_BUFFER_SIZE: usize = 256;

pub const DEFAULT_DURATION: Duration = gceconfig::DEFAULT_DISCOVERY_DURATION;
pub const DEFAULT_POLL_INTERVAL: Duration = gceconfig::DEFAULT_POLL_INTERVAL;

/// Where and for how long to search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub duration: Duration,
    pub target: SocketAddr,
    pub poll_interval: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            target: SocketAddr::from((gceconfig::DEFAULT_BROADCAST_ADDRESS, DISCOVERY_PORT)),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DiscoveryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            duration: config.get_discovery_duration(),
            target: SocketAddr::from((
                config.get_discovery_broadcast_address(),
                config.get_discovery_port(),
            )),
            poll_interval: config.get_discovery_poll_interval(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    /// Number of poll slices the search runs for.
    pub fn poll_slices(&self) -> Result<u64, GceError> {
        if self.poll_interval.is_zero() {
            return Err(GceError::invalid_discovery_options(
                "poll interval must be greater than zero",
            ));
        }
        let budget = self.duration.as_secs_f64() / self.poll_interval.as_secs_f64();
        Ok(budget.ceil() as u64)
    }
}
