use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gcedevices::{DeviceRecord, DiscoveryOptions, NameFilter, discover, discover_first};

const ECO: &[u8] = b"ECO-DEVICES\r\n00:04:A3:12:34:56\r\n80\r\n";
const CUISINE: &[u8] = b"Cuisine\r\n00:04:A3:00:00:02\r\n8080\r\n";
const GARAGE: &[u8] = b"Garage\r\n00:04:A3:00:00:03\r\n80\r\n";

/// Fake gateway(s): waits for the discovery datagram on loopback, then
/// answers it with every reply in order. Returns the received request.
fn spawn_responder(replies: Vec<&'static [u8]>) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let addr = socket.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 64];
        let (n, from) = socket.recv_from(&mut buf).unwrap();
        for reply in replies {
            socket.send_to(reply, from).unwrap();
        }
        buf[..n].to_vec()
    });

    (addr, handle)
}

fn options(target: SocketAddr, millis: u64) -> DiscoveryOptions {
    DiscoveryOptions::default()
        .with_target(target)
        .with_duration(Duration::from_millis(millis))
}

fn names(devices: &[DeviceRecord]) -> Vec<&str> {
    devices.iter().map(|d| d.name.as_str()).collect()
}

#[test]
fn test_request_payload() {
    let (addr, responder) = spawn_responder(vec![ECO]);

    discover(&options(addr, 500), &NameFilter::First).unwrap();

    assert_eq!(responder.join().unwrap(), b"Discover GCE Devices");
}

#[test]
fn test_first_filter_returns_at_most_one_device() {
    let (addr, responder) = spawn_responder(vec![ECO, CUISINE, GARAGE]);

    let devices = discover(&options(addr, 1000), &NameFilter::First).unwrap();
    responder.join().unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(
        devices[0],
        DeviceRecord::new(Ipv4Addr::LOCALHOST, "ECO-DEVICES", "00:04:A3:12:34:56", 80)
    );
}

#[test]
fn test_discover_first_matches_discover() {
    let (addr, responder) = spawn_responder(vec![CUISINE, ECO]);
    let listed = discover(&options(addr, 500), &NameFilter::First).unwrap();
    responder.join().unwrap();

    let (addr, responder) = spawn_responder(vec![CUISINE, ECO]);
    let first = discover_first(&options(addr, 500)).unwrap();
    responder.join().unwrap();

    assert_eq!(first.as_ref(), listed.first());
    assert_eq!(first.unwrap().name, "Cuisine");
}

#[test]
fn test_named_filter_ignores_case_and_other_devices() {
    let (addr, responder) = spawn_responder(vec![CUISINE, ECO, GARAGE]);

    let devices = discover(
        &options(addr, 1000),
        &NameFilter::parse(Some("eco-devices")),
    )
    .unwrap();
    responder.join().unwrap();

    assert_eq!(names(&devices), vec!["ECO-DEVICES"]);
}

#[test]
fn test_named_filter_without_match_is_empty() {
    let (addr, responder) = spawn_responder(vec![CUISINE, GARAGE]);

    let devices = discover(&options(addr, 400), &NameFilter::parse(Some("Salon"))).unwrap();
    responder.join().unwrap();

    assert!(devices.is_empty());
}

#[test]
fn test_wildcard_collects_in_arrival_order() {
    let (addr, responder) = spawn_responder(vec![ECO, CUISINE, GARAGE]);

    let devices = discover(&options(addr, 1000), &NameFilter::parse(Some("*"))).unwrap();
    responder.join().unwrap();

    assert_eq!(names(&devices), vec!["ECO-DEVICES", "Cuisine", "Garage"]);
    assert_eq!(devices[1].port, 8080);
}

#[test]
fn test_wildcard_count_grows_with_duration() {
    let mut counts = Vec::new();
    for millis in [100, 200, 500, 1000] {
        let (addr, responder) = spawn_responder(vec![ECO, CUISINE, GARAGE]);
        let devices = discover(&options(addr, millis), &NameFilter::Any).unwrap();
        responder.join().unwrap();
        counts.push(devices.len());
    }

    // One datagram per poll slice at most.
    assert!(counts[0] <= 1);
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{:?}", counts);
    assert_eq!(counts.last(), Some(&3));
}

#[test]
fn test_malformed_replies_are_skipped() {
    let garbage: &'static [u8] = b"garbage";
    let bad_port: &'static [u8] = b"ECO\r\n00:04:A3:00:00:09\r\nnot-a-port\r\n";
    let (addr, responder) = spawn_responder(vec![garbage, bad_port, GARAGE]);

    let first = discover_first(&options(addr, 1000)).unwrap();
    responder.join().unwrap();

    assert_eq!(first.map(|d| d.name), Some("Garage".to_string()));
}

#[test]
fn test_silent_network_is_not_an_error() {
    // Bound but never answering.
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = silent.local_addr().unwrap();

    assert!(discover(&options(addr, 300), &NameFilter::Any).unwrap().is_empty());
    assert_eq!(discover_first(&options(addr, 200)).unwrap(), None);
}

#[test]
fn test_zero_duration_does_not_wait() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = silent.local_addr().unwrap();

    let devices = discover(&options(addr, 0), &NameFilter::Any).unwrap();

    assert!(devices.is_empty());
}
