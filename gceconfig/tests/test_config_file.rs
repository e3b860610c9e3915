use std::fs;
use std::net::Ipv4Addr;
use std::time::Duration;

use gceconfig::Config;
use serde_yaml::Value;

fn write_config(dir: &tempfile::TempDir, yaml: &str) {
    fs::write(dir.path().join("config.yaml"), yaml).unwrap();
}

#[test]
fn test_file_overrides_only_given_keys() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        &dir,
        "host:\n  discovery:\n    duration_secs: 3\n    broadcast_address: 192.168.1.255\n",
    );

    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

    assert_eq!(config.get_discovery_duration(), Duration::from_secs(3));
    assert_eq!(
        config.get_discovery_broadcast_address(),
        Ipv4Addr::new(192, 168, 1, 255)
    );
    // Untouched keys keep the embedded defaults
    assert_eq!(config.get_discovery_port(), 30303);
    assert_eq!(
        config.get_discovery_poll_interval(),
        Duration::from_millis(100)
    );
}

#[test]
fn test_keys_are_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    write_config(&dir, "Host:\n  HTTP:\n    Timeout_Secs: 10\n");

    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

    assert_eq!(config.get_http_timeout(), Some(Duration::from_secs(10)));
}

#[test]
fn test_load_does_not_create_files() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("not-yet");

    let config = Config::load_config(config_dir.to_str().unwrap()).unwrap();

    assert!(!config_dir.exists());
    assert_eq!(config.get_discovery_port(), 30303);
}

#[test]
fn test_save_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("gce");
    let config_dir = config_dir.to_str().unwrap();

    let config = Config::load_config(config_dir).unwrap();
    config
        .set_value(&["host", "discovery", "port"], Value::from(31000))
        .unwrap();
    config.save().unwrap();

    let reloaded = Config::load_config(config_dir).unwrap();
    assert_eq!(reloaded.config_dir(), config_dir);
    assert_eq!(reloaded.get_discovery_port(), 31000);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_config(&dir, "host: [unterminated\n");

    assert!(Config::load_config(dir.path().to_str().unwrap()).is_err());
}
