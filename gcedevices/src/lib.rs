//! Client for GCE Electronics Eco-Devices teleinfo gateways.
//!
//! ```no_run
//! use gcedevices::EcoDevicesClient;
//!
//! let client = EcoDevicesClient::new();
//! if let Some(fields) = client.teleinfo(1, None)? {
//!     for (key, value) in &fields {
//!         println!("{key} = {value} ({})", gcedevices::label_for(key));
//!     }
//! }
//! # Ok::<(), gcedevices::GceError>(())
//! ```

pub mod device;
pub mod discovery;
pub mod errors;
pub mod http_client;
pub mod labels;
pub mod telemetry;
pub mod teleinfo_parser;

pub use device::{DeviceRecord, NameFilter};
pub use discovery::{DiscoveryOptions, discover, discover_first};
pub use errors::GceError;
pub use http_client::{HttpReply, HttpTransport, UreqTransport};
pub use labels::{TELEINFO_LABELS, UNKNOWN_LABEL, label_for};
pub use telemetry::{Counters, EcoDevicesClient, JsonObject};
pub use teleinfo_parser::{ExtractError, FieldMapping, extract, extract_from_reader};
