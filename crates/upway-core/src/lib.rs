//! Bridge logic between the myUpway portal (`upway-api`) and an MQTT broker.
//!
//! - **[`Catalog`]**: the immutable list of sensor and binary-sensor
//!   descriptors, keyed by portal variable id.
//! - **[`discovery`]**: turns the catalog into retained auto-discovery
//!   config messages, published once at startup.
//! - **[`poll`]**: one fetch-and-publish cycle: a single value request for
//!   the whole catalog, demultiplexed into per-sensor state topics.
//! - **[`PublishSink`]**: the seam to the publish transport;
//!   [`MqttPublisher`] is the `rumqttc` implementation.
//! - **[`Bridge`]**: the scheduler: login, discovery, an immediate cycle,
//!   then one cycle per interval until cancelled, and a bounded drain.

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod mqtt;
pub mod poll;
pub mod publish;
pub mod topics;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use catalog::{BinarySensorDescriptor, Catalog, SensorDescriptor};
pub use config::{BridgeConfig, MqttSettings, PortalSettings};
pub use discovery::{DeviceInfo, DiscoveryMessage};
pub use error::CoreError;
pub use mqtt::MqttPublisher;
pub use poll::{NO_DATA_SENTINEL, PollReport, ValueMap};
pub use publish::{LogSink, PublishSink};
pub use topics::Topics;
