//! `gce`: find Eco-Devices gateways and print their teleinfo readings.

mod options;

use std::env;
use std::io;

use anyhow::Result;
use gcedevices::{
    Counters, DeviceRecord, DiscoveryOptions, EcoDevicesClient, FieldMapping, NameFilter,
    UreqTransport, discover, label_for,
};
use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::options::{CliOptions, Command, print_usage};

fn main() -> Result<()> {
    let config = gceconfig::get_config();
    init_tracing(&config.get_log_level());

    let options = CliOptions::parse(env::args().skip(1))?;
    debug!(?options, config_dir = config.config_dir(), "Starting gce");

    let mut discovery = DiscoveryOptions::from_config(&config);
    if let Some(duration) = options.duration {
        discovery = discovery.with_duration(duration);
    }
    let client = EcoDevicesClient::with_transport(UreqTransport::from_config(&config), discovery);

    match options.command {
        Command::Help => print_usage(),
        Command::Find(name) => find(&client, name.as_deref())?,
        Command::List => list(&client)?,
        Command::Status => {
            let Some(device) = resolve_device(&client, options.device)? else {
                return Ok(());
            };
            if let Some(values) = client.status(Some(&device))? {
                print_fields(&values);
            }
        }
        Command::Donnees => {
            let Some(device) = resolve_device(&client, options.device)? else {
                return Ok(());
            };
            if let Some(data) = client.donnees(Some(&device))? {
                for (key, value) in sorted(&data) {
                    println!("{:>20} : {:<14}", key, json_text(value));
                }
            }
        }
        Command::Report { channel } => report(&client, options.device, channel)?,
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    let _ = tracing_log::LogTracer::init();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init();
}

fn find(client: &EcoDevicesClient, name: Option<&str>) -> Result<()> {
    let devices = discover(client.discovery_options(), &NameFilter::parse(name))?;
    if let Some(device) = devices.first() {
        println!("{}", device);
    }
    Ok(())
}

fn list(client: &EcoDevicesClient) -> Result<()> {
    for device in discover(client.discovery_options(), &NameFilter::Any)? {
        println!("{} {} {}", device, device.name, device.mac_address);
    }
    Ok(())
}

/// Device given on the command line, or the first one found.
fn resolve_device(
    client: &EcoDevicesClient,
    device: Option<DeviceRecord>,
) -> Result<Option<DeviceRecord>> {
    match device {
        Some(device) => Ok(Some(device)),
        None => {
            let found = gcedevices::discover_first(client.discovery_options())?;
            if found.is_none() {
                warn!("No Eco-Devices gateway found");
            }
            Ok(found)
        }
    }
}

fn report(client: &EcoDevicesClient, device: Option<DeviceRecord>, channel: u8) -> Result<()> {
    println!("Test GCE");
    let Some(device) = resolve_device(client, device)? else {
        println!("Device: none");
        return Ok(());
    };
    println!(
        "Device: {} {} {}",
        device, device.name, device.mac_address
    );

    println!("Teleinfo:");
    match client.teleinfo(channel, Some(&device))? {
        Some(values) => {
            for (key, value) in &values {
                println!("{:>20} : {:<14} {}", key, value, label_for(key));
            }
        }
        None => warn!("No teleinfo from {}", device),
    }

    println!("Compteurs:");
    match client.compteurs(Some(&device))? {
        Some(object) => {
            let counters = Counters::from_object(&object)?;
            println!(
                "{:>20} : {:<14} {}",
                "C1",
                json_text(&counters.day_c1),
                "Compteur 1"
            );
            println!(
                "{:>20} : {:<14} {}",
                "C2",
                json_text(&counters.day_c2),
                "Compteur 2"
            );
        }
        None => warn!("No counters from {}", device),
    }

    Ok(())
}

fn print_fields(values: &FieldMapping) {
    for (key, value) in values {
        println!("{:>20} : {:<14}", key, value);
    }
}

fn sorted(object: &serde_json::Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = object.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// JSON strings unquoted, anything else in its JSON form.
fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
