//! Broadcast-and-collect discovery loop.
//!
//! The socket binds an ephemeral port on `0.0.0.0`: gateways answer unicast
//! to the sender, nothing has to listen on 30303 locally.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, trace, warn};

use super::{DISCOVERY_PAYLOAD, DiscoveryOptions, RECV_BUFFER_SIZE};
use crate::device::{DeviceRecord, NameFilter};
use crate::errors::GceError;

fn open_socket(poll_interval: Duration) -> std::io::Result<UdpSocket> {
    let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket2.set_broadcast(true)?;

    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
    socket2.bind(&bind_addr.into())?;

    let socket: UdpSocket = socket2.into();
    socket.set_read_timeout(Some(poll_interval))?;
    Ok(socket)
}

/// Searches the local network for Eco-Devices gateways.
///
/// Returns the accepted devices in arrival order. An empty result is not an
/// error; only socket failures are.
pub fn discover(
    options: &DiscoveryOptions,
    filter: &NameFilter,
) -> Result<Vec<DeviceRecord>, GceError> {
    let slices = options.poll_slices()?;

    let socket = open_socket(options.poll_interval).map_err(GceError::Discovery)?;
    socket
        .send_to(DISCOVERY_PAYLOAD, options.target)
        .map_err(GceError::Discovery)?;
    info!(
        target_addr = %options.target,
        slices,
        filter = ?filter,
        "📤 Discovery request sent"
    );

    let mut devices = Vec::new();
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    for _ in 0..slices {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                let Some(device) = parse_reply(&buf[..n], from) else {
                    continue;
                };
                debug!("📥 Discovery reply from {}: {:?}", from, device);

                if filter.accepts(&device) {
                    devices.push(device);
                    if filter.stops_on_match() {
                        break;
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                warn!("❌ Discovery read error: {}", e);
                return Err(GceError::Discovery(e));
            }
        }
    }

    debug!("Discovery finished with {} device(s)", devices.len());
    Ok(devices)
}

/// Returns the first device answering within the time budget, if any.
pub fn discover_first(options: &DiscoveryOptions) -> Result<Option<DeviceRecord>, GceError> {
    Ok(discover(options, &NameFilter::First)?.into_iter().next())
}

/// Turns one reply datagram into a device record.
///
/// The reply is split on CRLF and its last segment dropped (the gateways
/// terminate every line, so this is the empty tail). Replies that are not
/// ASCII, carry fewer than three lines or an invalid port are rejected.
pub fn parse_reply(data: &[u8], from: SocketAddr) -> Option<DeviceRecord> {
    let IpAddr::V4(address) = from.ip() else {
        trace!("Ignoring discovery reply from non-IPv4 sender {}", from);
        return None;
    };

    if !data.is_ascii() {
        warn!("Ignoring non-ASCII discovery reply from {}", from);
        return None;
    }
    let text = String::from_utf8_lossy(data);

    let mut lines: Vec<&str> = text.split("\r\n").collect();
    lines.pop();
    let fields: Vec<&str> = lines.into_iter().map(str::trim).collect();

    let [name, mac_address, port, rest @ ..] = fields.as_slice() else {
        warn!(
            "Ignoring discovery reply from {} with {} field(s): {:?}",
            from,
            fields.len(),
            text
        );
        return None;
    };
    if !rest.is_empty() {
        trace!("Ignoring extra discovery fields from {}: {:?}", from, rest);
    }

    let Ok(port) = port.parse::<u16>() else {
        warn!("Ignoring discovery reply from {} with port {:?}", from, port);
        return None;
    };

    Some(DeviceRecord::new(address, name, mac_address, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from() -> SocketAddr {
        "192.168.1.20:30303".parse().unwrap()
    }

    #[test]
    fn parse_reply_prepends_sender_address() {
        let device = parse_reply(b"ECO-DEVICES\r\n00:04:A3:12:34:56\r\n80\r\n", from()).unwrap();
        assert_eq!(
            device,
            DeviceRecord::new(
                Ipv4Addr::new(192, 168, 1, 20),
                "ECO-DEVICES",
                "00:04:A3:12:34:56",
                80
            )
        );
    }

    #[test]
    fn parse_reply_trims_each_line() {
        let device = parse_reply(b"  Salon \r\n\t00:04:A3:00:00:02\r\n 8080 \r\n", from()).unwrap();
        assert_eq!(device.name, "Salon");
        assert_eq!(device.mac_address, "00:04:A3:00:00:02");
        assert_eq!(device.port, 8080);
    }

    #[test]
    fn parse_reply_always_drops_last_segment() {
        // Without the final CRLF the port line is the dropped tail.
        assert!(parse_reply(b"ECO-DEVICES\r\n00:04:A3:12:34:56\r\n80", from()).is_none());
        assert!(parse_reply(b"", from()).is_none());
    }

    #[test]
    fn parse_reply_ignores_extra_lines() {
        let device =
            parse_reply(b"ECO-DEVICES\r\n00:04:A3:12:34:56\r\n80\r\nv1.3\r\n", from()).unwrap();
        assert_eq!(device.port, 80);
    }

    #[test]
    fn parse_reply_rejects_bad_input() {
        assert!(parse_reply(b"ECO\r\nmac\r\nhttp\r\n", from()).is_none());
        assert!(parse_reply("Éco\r\nmac\r\n80\r\n".as_bytes(), from()).is_none());
        let v6: SocketAddr = "[::1]:30303".parse().unwrap();
        assert!(parse_reply(b"ECO\r\nmac\r\n80\r\n", v6).is_none());
    }
}
