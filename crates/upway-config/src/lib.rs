//! Configuration for the upway bridge.
//!
//! Built-in defaults, then an optional TOML file, then the process
//! environment, merged with `figment` and validated into the typed
//! settings `upway_core` runs on. Environment keys are the upper-case
//! spelling of the TOML keys (`MQTT_HOST` / `mqtt_host`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

use upway_core::{BridgeConfig, MqttSettings, PortalSettings};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "UPWAY_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{key} is not set")]
    Missing { key: String },

    #[error("config file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_uppercase(),
            reason: reason.into(),
        }
    }
}

// ── Raw config ──────────────────────────────────────────────────────

/// Keys read from the environment as numbers, as written in TOML.
const NUMERIC_KEYS: &[&str] = &[
    "mqtt_port",
    "update_interval",
    "http_timeout",
    "shutdown_timeout",
];

/// Keys read from the environment verbatim. `Env` would parse `0123` as
/// the number 123, so these bypass its value parsing.
const STRING_KEYS: &[&str] = &[
    "mqtt_host",
    "mqtt_topic",
    "mqtt_discovery_prefix",
    "mqtt_client_id",
    "mqtt_username",
    "mqtt_password",
    "myupway_username",
    "myupway_password",
    "myupway_system_id",
    "myupway_base_url",
];

const MAX_UPDATE_INTERVAL_MINUTES: u64 = 24 * 60;
const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Flat key/value view of the configuration before validation.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawConfig {
    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub mqtt_host: Option<String>,

    pub mqtt_port: u16,

    #[serde(default, deserialize_with = "scalar")]
    pub mqtt_topic: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub mqtt_discovery_prefix: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub mqtt_client_id: Option<String>,

    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub mqtt_username: Option<String>,

    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub mqtt_password: Option<String>,

    /// Minutes between poll cycles.
    pub update_interval: u64,

    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub myupway_username: Option<String>,

    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub myupway_password: Option<String>,

    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub myupway_system_id: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub myupway_base_url: Option<String>,

    /// Seconds.
    pub http_timeout: u64,

    /// Seconds.
    pub shutdown_timeout: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            mqtt_host: None,
            mqtt_port: 1883,
            mqtt_topic: Some("myupway".into()),
            mqtt_discovery_prefix: Some("homeassistant".into()),
            mqtt_client_id: Some("upway-bridge".into()),
            mqtt_username: None,
            mqtt_password: None,
            update_interval: 1,
            myupway_username: None,
            myupway_password: None,
            myupway_system_id: None,
            myupway_base_url: Some("https://myupway.com/".into()),
            http_timeout: 30,
            shutdown_timeout: 10,
        }
    }
}

/// Accept any scalar as a string, for TOML like `myupway_system_id = 42`.
fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|v| match v {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

// ── Validated settings ──────────────────────────────────────────────

/// Everything the bridge needs to run.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub portal: PortalSettings,
    pub mqtt: MqttSettings,
    pub bridge: BridgeConfig,
}

/// Whether the broker must be configured. Dry runs never connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broker {
    Required,
    Optional,
}

// ── Config file path ────────────────────────────────────────────────

/// Platform config file location, e.g. `~/.config/upway/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "upway").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Pick the TOML file to read: an explicit path, else `UPWAY_CONFIG`, else
/// the platform default if it exists. Explicit paths must exist.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound { path });
        }
        return Ok(Some(path));
    }

    Ok(default_config_path().filter(|p| p.is_file()))
}

// ── Loading ─────────────────────────────────────────────────────────

/// Merge defaults, the TOML file (if any) and the environment.
pub fn load_raw(path: Option<&Path>) -> Result<RawConfig, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(RawConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment
        .merge(Env::raw().only(NUMERIC_KEYS))
        .merge(Serialized::defaults(string_env()));

    Ok(figment.extract()?)
}

fn string_env() -> BTreeMap<String, String> {
    Env::raw()
        .only(STRING_KEYS)
        .iter()
        .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
        .collect()
}

/// Resolve the file, load and validate.
pub fn load(explicit: Option<&Path>, broker: Broker) -> Result<BridgeSettings, ConfigError> {
    let path = resolve_config_path(explicit)?;
    let raw = load_raw(path.as_deref())?;
    validate(raw, broker)
}

/// Turn a raw config into typed settings.
pub fn validate(raw: RawConfig, broker: Broker) -> Result<BridgeSettings, ConfigError> {
    let username = required("myupway_username", raw.myupway_username)?;
    // Passwords are taken verbatim, surrounding spaces included.
    let password = raw
        .myupway_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ConfigError::Missing {
            key: "MYUPWAY_PASSWORD".into(),
        })?;
    let system_id = required("myupway_system_id", raw.myupway_system_id)?;

    let host = match broker {
        Broker::Required => required("mqtt_host", raw.mqtt_host)?,
        Broker::Optional => non_empty(raw.mqtt_host).unwrap_or_else(|| "localhost".into()),
    };
    if raw.mqtt_port == 0 {
        return Err(ConfigError::invalid("mqtt_port", "must be between 1 and 65535"));
    }

    let mqtt_username = non_empty(raw.mqtt_username);
    let mqtt_password = raw.mqtt_password.filter(|p| !p.is_empty());
    if mqtt_password.is_some() && mqtt_username.is_none() {
        return Err(ConfigError::invalid(
            "mqtt_password",
            "set without MQTT_USERNAME",
        ));
    }

    let root_topic = topic_segment("mqtt_topic", raw.mqtt_topic)?;
    let discovery_prefix = topic_segment("mqtt_discovery_prefix", raw.mqtt_discovery_prefix)?;

    if !(1..=MAX_UPDATE_INTERVAL_MINUTES).contains(&raw.update_interval) {
        return Err(ConfigError::invalid(
            "update_interval",
            format!("must be between 1 and {MAX_UPDATE_INTERVAL_MINUTES} minutes"),
        ));
    }
    let update_interval = raw
        .update_interval
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::invalid("update_interval", "too large"))?;
    if !(1..=MAX_TIMEOUT_SECS).contains(&raw.http_timeout) {
        return Err(ConfigError::invalid(
            "http_timeout",
            format!("must be between 1 and {MAX_TIMEOUT_SECS} seconds"),
        ));
    }
    if raw.shutdown_timeout > MAX_TIMEOUT_SECS {
        return Err(ConfigError::invalid(
            "shutdown_timeout",
            format!("must be at most {MAX_TIMEOUT_SECS} seconds"),
        ));
    }

    let base_url = required("myupway_base_url", raw.myupway_base_url)?;
    let base_url =
        Url::parse(&base_url).map_err(|e| ConfigError::invalid("myupway_base_url", e.to_string()))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "myupway_base_url",
            "must be an http or https URL",
        ));
    }

    Ok(BridgeSettings {
        portal: PortalSettings {
            base_url,
            username,
            password: SecretString::from(password),
            system_id,
            timeout: Duration::from_secs(raw.http_timeout),
        },
        mqtt: MqttSettings {
            host,
            port: raw.mqtt_port,
            client_id: non_empty(raw.mqtt_client_id).unwrap_or_else(|| "upway-bridge".into()),
            username: mqtt_username,
            password: mqtt_password.map(SecretString::from),
            ..MqttSettings::default()
        },
        bridge: BridgeConfig {
            root_topic,
            discovery_prefix,
            update_interval,
            shutdown_timeout: Duration::from_secs(raw.shutdown_timeout),
        },
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    non_empty(value).ok_or_else(|| ConfigError::Missing {
        key: key.to_uppercase(),
    })
}

fn topic_segment(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    let value = required(key, value)?;
    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(key, "must not be empty"));
    }
    if trimmed.contains(['+', '#']) {
        return Err(ConfigError::invalid(key, "must not contain MQTT wildcards"));
    }
    Ok(trimmed.to_owned())
}

// ── Tests ───────────────────────────────────────────────────────────
