//! # GCE Configuration Module
//!
//! Configuration management for the Eco-Devices client:
//! - Embedded default configuration (`gce.yaml`)
//! - Optional `config.yaml` merged over the defaults
//! - Environment variable overrides (`GCE_CONFIG__SECTION__KEY=value`)
//! - Typed getters falling back to defaults on invalid values
//! - Process-wide singleton access
//!
//! ## Usage
//!
//! ```no_run
//! use gceconfig::get_config;
//!
//! let config = get_config();
//! let duration = config.get_discovery_duration();
//! let port = config.get_discovery_port();
//! println!("discovering on port {port} for {duration:?}");
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    net::Ipv4Addr,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{debug, info, warn};

const DEFAULT_CONFIG: &str = include_str!("gce.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load GCE configuration"));
}

const ENV_CONFIG_DIR: &str = "GCE_CONFIG";
const ENV_PREFIX: &str = "GCE_CONFIG__";
const CONFIG_DIR_NAME: &str = ".gce";
const CONFIG_FILE_NAME: &str = "config.yaml";

pub const DEFAULT_DISCOVERY_DURATION: Duration = Duration::from_secs(1);
pub const DEFAULT_DISCOVERY_PORT: u16 = 30303;
pub const DEFAULT_BROADCAST_ADDRESS: Ipv4Addr = Ipv4Addr::BROADCAST;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_LOG_MIN_LEVEL: &str = "warn";

/// Configuration manager for the GCE client
///
/// Holds the merged YAML tree. Values are read through typed getters that
/// never fail: an invalid or missing entry logs a warning and yields the
/// default.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.lock_data().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    ///
    /// 1. The provided `directory` if not empty
    /// 2. The `GCE_CONFIG` environment variable
    /// 3. `.gce` in the current directory
    /// 4. `.gce` in the user's home directory
    ///
    /// Falls back to `.gce` in the current directory. Nothing is created.
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Loads the configuration from the specified directory
    ///
    /// The embedded defaults are merged with `config.yaml` when the file
    /// exists, then `GCE_CONFIG__*` environment variables are applied.
    /// Unlike [`Config::save`], loading never touches the filesystem.
    pub fn load_config(directory: &str) -> Result<Self> {
        Self::load_with_overrides(directory, env::vars())
    }

    fn load_with_overrides<I>(directory: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config_dir = Self::find_config_dir(directory);
        debug!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join(CONFIG_FILE_NAME);
        let path = config_file_path.to_string_lossy().to_string();

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file=%path, "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut config_value, &Self::lower_keys_value(external_value));
            }
            Err(_) => {
                debug!(config_file=%path, "Config file not found, using default embedded config");
            }
        }

        let mut config_value = Self::lower_keys_value(config_value);
        Self::apply_overrides(&mut config_value, vars);

        Ok(Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        })
    }

    /// Directory the configuration was resolved from
    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// Writes the current configuration to `config.yaml`, creating the
    /// configuration directory when needed
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        let yaml = serde_yaml::to_string(&*self.lock_data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    fn lock_data(&self) -> std::sync::MutexGuard<'_, Value> {
        // The tree is always left consistent, a poisoned lock is still usable.
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets a configuration value at the specified path (in memory only)
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys, e.g. `&["host", "discovery", "port"]`
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.lock_data();
        Self::set_value_internal(&mut data, path, value)
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock_data();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => {
                        return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                    }
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_overrides<I>(config: &mut Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(err) = Self::set_value_internal(config, &key_path, yaml_value) {
                    warn!(variable=%key, "Ignoring config override: {}", err);
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(k, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    fn get_f64(&self, path: &[&str]) -> Option<f64> {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_f64(),
            Ok(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Total discovery time budget (`host.discovery.duration_secs`)
    pub fn get_discovery_duration(&self) -> Duration {
        match self
            .get_f64(&["host", "discovery", "duration_secs"])
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        {
            Some(duration) => duration,
            None => {
                warn!(
                    "Invalid discovery duration, using default {:?}",
                    DEFAULT_DISCOVERY_DURATION
                );
                DEFAULT_DISCOVERY_DURATION
            }
        }
    }

    /// UDP port the discovery datagram is sent to (`host.discovery.port`)
    pub fn get_discovery_port(&self) -> u16 {
        match self.get_value(&["host", "discovery", "port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    warn!(
                        "Invalid discovery port {}, using default {}",
                        n, DEFAULT_DISCOVERY_PORT
                    );
                    DEFAULT_DISCOVERY_PORT
                }
            },
            Ok(Value::String(s)) => s.parse::<u16>().unwrap_or_else(|_| {
                warn!(
                    "Invalid discovery port '{}', using default {}",
                    s, DEFAULT_DISCOVERY_PORT
                );
                DEFAULT_DISCOVERY_PORT
            }),
            _ => DEFAULT_DISCOVERY_PORT,
        }
    }

    /// Broadcast address used for discovery (`host.discovery.broadcast_address`)
    pub fn get_discovery_broadcast_address(&self) -> Ipv4Addr {
        match self.get_value(&["host", "discovery", "broadcast_address"]) {
            Ok(Value::String(s)) => s.parse::<Ipv4Addr>().unwrap_or_else(|_| {
                warn!(
                    "Invalid broadcast address '{}', using default {}",
                    s, DEFAULT_BROADCAST_ADDRESS
                );
                DEFAULT_BROADCAST_ADDRESS
            }),
            _ => DEFAULT_BROADCAST_ADDRESS,
        }
    }

    /// Length of one discovery poll slice (`host.discovery.poll_interval_ms`)
    pub fn get_discovery_poll_interval(&self) -> Duration {
        match self.get_value(&["host", "discovery", "poll_interval_ms"]) {
            Ok(Value::Number(n)) if n.as_u64().is_some_and(|ms| ms > 0) => {
                Duration::from_millis(n.as_u64().unwrap_or_default())
            }
            Ok(Value::Null) | Err(_) => DEFAULT_POLL_INTERVAL,
            Ok(other) => {
                warn!(
                    "Invalid poll interval {:?}, using default {:?}",
                    other, DEFAULT_POLL_INTERVAL
                );
                DEFAULT_POLL_INTERVAL
            }
        }
    }

    /// Global HTTP timeout (`host.http.timeout_secs`), `None` when unset
    pub fn get_http_timeout(&self) -> Option<Duration> {
        match self.get_value(&["host", "http", "timeout_secs"]) {
            Ok(Value::Null) | Err(_) => None,
            _ => match self
                .get_f64(&["host", "http", "timeout_secs"])
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            {
                Some(timeout) if !timeout.is_zero() => Some(timeout),
                _ => {
                    warn!("Invalid HTTP timeout, requests will not time out");
                    None
                }
            },
        }
    }

    /// Default log filter (`host.logger.min_level`)
    pub fn get_log_level(&self) -> String {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }
}

/// Returns the global configuration instance, loaded on first access
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Recursively merges `external` into `default`: mappings are merged key by
/// key, scalars and sequences are replaced.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
