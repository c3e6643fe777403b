// ── Runtime bridge configuration ──
//
// These types describe *what* to bridge and *where* to. They carry
// credential data and tuning, but never touch disk or the environment:
// upway-config builds them and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use upway_api::{Credentials, PortalSession, TransportConfig};

use crate::error::CoreError;

/// Portal connection settings.
#[derive(Debug, Clone)]
pub struct PortalSettings {
    /// Portal root, `https://myupway.com/` in production.
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    /// Heat-pump system id (`hpid`), also part of the login return URL.
    pub system_id: String,
    /// Per-request timeout; the only bound on an unresponsive portal.
    pub timeout: Duration,
}

impl PortalSettings {
    /// Build a fresh, not yet authenticated session with an empty cookie jar.
    pub fn build_session(&self) -> Result<PortalSession, CoreError> {
        let transport = TransportConfig::default()
            .with_timeout(self.timeout)
            .with_cookie_jar();
        let credentials = Credentials::new(self.username.clone(), self.password.clone());
        Ok(PortalSession::new(
            self.base_url.clone(),
            self.system_id.clone(),
            credentials,
            &transport,
        )?)
    }
}

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub keep_alive: Duration,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "upway-bridge".into(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Topic layout and scheduling for one bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Root topic; values go to `{root}/sensor/{identifier}`.
    pub root_topic: String,
    /// Auto-discovery prefix, `homeassistant` by convention.
    pub discovery_prefix: String,
    /// Time between poll cycles.
    pub update_interval: Duration,
    /// Upper bound on waiting for the publish queue to drain at shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            root_topic: "myupway".into(),
            discovery_prefix: "homeassistant".into(),
            update_interval: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}
