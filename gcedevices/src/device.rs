use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use crate::errors::GceError;

/// An Eco-Devices gateway as announced by its discovery reply.
///
/// `name`, `mac_address` and `port` come verbatim (trimmed) from the reply,
/// `address` is the source address the reply was received from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceRecord {
    pub address: Ipv4Addr,
    pub name: String,
    pub mac_address: String,
    pub port: u16,
}

impl DeviceRecord {
    pub fn new(address: Ipv4Addr, name: &str, mac_address: &str, port: u16) -> Self {
        Self {
            address,
            name: name.to_string(),
            mac_address: mac_address.to_string(),
            port,
        }
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.address, self.port)
    }

    /// `http://address:port`, without trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Parses `address:port` for a device known without discovery. Name and MAC
/// address are left empty.
impl FromStr for DeviceRecord {
    type Err = GceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = SocketAddrV4::from_str(s.trim())
            .map_err(|_| GceError::InvalidDeviceAddress(s.to_string()))?;
        Ok(DeviceRecord::new(*addr.ip(), "", "", addr.port()))
    }
}

/// Which discovery replies are accepted, and whether the first accepted one
/// ends the search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameFilter {
    /// Accept the first reply and stop.
    First,
    /// Accept every reply until the time budget is spent.
    Any,
    /// Accept the first reply whose name matches, ignoring ASCII case.
    Named(String),
}

impl NameFilter {
    pub const WILDCARD: &'static str = "*";

    pub fn parse(name: Option<&str>) -> Self {
        match name {
            None => NameFilter::First,
            Some(Self::WILDCARD) => NameFilter::Any,
            Some(name) => NameFilter::Named(name.to_string()),
        }
    }

    pub fn accepts(&self, device: &DeviceRecord) -> bool {
        match self {
            NameFilter::First | NameFilter::Any => true,
            NameFilter::Named(name) => device.name.eq_ignore_ascii_case(name),
        }
    }

    pub fn stops_on_match(&self) -> bool {
        !matches!(self, NameFilter::Any)
    }
}
