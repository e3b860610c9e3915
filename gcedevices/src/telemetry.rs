//! Telemetry retrieval from an Eco-Devices gateway.
//!
//! | Operation     | Endpoint                                   | Decoding              |
//! |---------------|--------------------------------------------|-----------------------|
//! | `teleinfo(n)` | `/protect/settings/teleinfo{n}.xml`        | elements `T{n}_*`     |
//! | `status`      | `/status.xml`                              | every element         |
//! | `donnees`     | `/api/xdevices.json?cmd=10`                | JSON object, as-is    |
//! | `compteurs`   | `/api/xdevices.json?cmd=20`                | JSON object, as-is    |
//!
//! Every operation takes an optional device. Without one, the first gateway
//! answering discovery is used, and `Ok(None)` is returned when none does.

use std::borrow::Cow;

use gceconfig::Config;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::device::DeviceRecord;
use crate::discovery::{DiscoveryOptions, discover_first};
use crate::errors::GceError;
use crate::http_client::{HttpTransport, UreqTransport};
use crate::teleinfo_parser::{FieldMapping, extract};

/// A decoded `xdevices.json` reply.
pub type JsonObject = Map<String, Value>;

pub const XDEVICES_SUMMARY_CMD: u32 = 10;
pub const XDEVICES_COUNTERS_CMD: u32 = 20;

pub fn teleinfo_url(device: &DeviceRecord, channel: u8) -> String {
    format!(
        "{}/protect/settings/teleinfo{}.xml",
        device.base_url(),
        channel
    )
}

pub fn status_url(device: &DeviceRecord) -> String {
    format!("{}/status.xml", device.base_url())
}

pub fn xdevices_url(device: &DeviceRecord, cmd: u32) -> String {
    format!("{}/api/xdevices.json?cmd={}", device.base_url(), cmd)
}

/// Element prefix used by teleinfo channel `channel`.
pub fn teleinfo_prefix(channel: u8) -> String {
    format!("T{}_", channel)
}

/// The two day counters of a `cmd=20` reply, values untouched.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Counters {
    #[serde(rename = "Day_C1")]
    pub day_c1: Value,
    #[serde(rename = "Day_C2")]
    pub day_c2: Value,
}

impl Counters {
    pub fn from_object(object: &JsonObject) -> Result<Self, GceError> {
        Ok(serde_json::from_value(Value::Object(object.clone()))?)
    }
}

pub struct EcoDevicesClient<T: HttpTransport = UreqTransport> {
    transport: T,
    discovery: DiscoveryOptions,
}

impl EcoDevicesClient<UreqTransport> {
    pub fn new() -> Self {
        Self::with_transport(UreqTransport::default(), DiscoveryOptions::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_transport(
            UreqTransport::from_config(config),
            DiscoveryOptions::from_config(config),
        )
    }
}

impl Default for EcoDevicesClient<UreqTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HttpTransport> EcoDevicesClient<T> {
    pub fn with_transport(transport: T, discovery: DiscoveryOptions) -> Self {
        Self {
            transport,
            discovery,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Options used when an operation has to find the device itself.
    pub fn discovery_options(&self) -> &DiscoveryOptions {
        &self.discovery
    }

    fn resolve_device<'a>(
        &self,
        device: Option<&'a DeviceRecord>,
    ) -> Result<Option<Cow<'a, DeviceRecord>>, GceError> {
        match device {
            Some(device) => Ok(Some(Cow::Borrowed(device))),
            None => {
                let found = discover_first(&self.discovery)?;
                if found.is_none() {
                    debug!("No Eco-Devices gateway answered discovery");
                }
                Ok(found.map(Cow::Owned))
            }
        }
    }

    /// Teleinfo fields of channel 1 or 2, keyed `T1_ADCO`, `T1_BASE`, ...
    ///
    /// Any other channel fails before discovery or network access.
    pub fn teleinfo(
        &self,
        channel: u8,
        device: Option<&DeviceRecord>,
    ) -> Result<Option<FieldMapping>, GceError> {
        if !matches!(channel, 1 | 2) {
            return Err(GceError::InvalidChannel(channel));
        }
        let Some(device) = self.resolve_device(device)? else {
            return Ok(None);
        };

        let url = teleinfo_url(&device, channel);
        self.fetch_fields(&url, &teleinfo_prefix(channel)).map(Some)
    }

    /// Every element of `status.xml`, the document the gateway web page polls.
    pub fn status(&self, device: Option<&DeviceRecord>) -> Result<Option<FieldMapping>, GceError> {
        let Some(device) = self.resolve_device(device)? else {
            return Ok(None);
        };

        self.fetch_fields(&status_url(&device), "").map(Some)
    }

    /// Summary of the gateway readings (`cmd=10`).
    pub fn donnees(&self, device: Option<&DeviceRecord>) -> Result<Option<JsonObject>, GceError> {
        let Some(device) = self.resolve_device(device)? else {
            return Ok(None);
        };

        self.fetch_json(&xdevices_url(&device, XDEVICES_SUMMARY_CMD))
    }

    /// Counters C1 and C2 (`cmd=20`), with at least `Day_C1` and `Day_C2`.
    pub fn compteurs(
        &self,
        device: Option<&DeviceRecord>,
    ) -> Result<Option<JsonObject>, GceError> {
        let Some(device) = self.resolve_device(device)? else {
            return Ok(None);
        };

        self.fetch_json(&xdevices_url(&device, XDEVICES_COUNTERS_CMD))
    }

    // The XML endpoints parse whatever body comes back, even on error
    // statuses; a gateway error page then fails as malformed XML.
    fn fetch_fields(&self, url: &str, prefix: &str) -> Result<FieldMapping, GceError> {
        let reply = self.transport.get(url)?;
        if !reply.is_ok() {
            warn!("{} returned HTTP status {}", url, reply.status);
        }
        Ok(extract(&reply.body, prefix)?)
    }

    fn fetch_json(&self, url: &str) -> Result<Option<JsonObject>, GceError> {
        let reply = self.transport.get(url)?;
        if !reply.is_ok() {
            debug!("{} returned HTTP status {}", url, reply.status);
            return Ok(None);
        }

        match serde_json::from_str::<Value>(&reply.body)? {
            Value::Object(object) => Ok(Some(object)),
            _ => Err(GceError::NotAnObject(url.to_string())),
        }
    }
}
