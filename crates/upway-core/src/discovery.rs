// ── Auto-discovery ──
//
// One retained config message per catalog entry. Absent optional fields
// are left out of the JSON entirely: consumers treat a missing key and an
// explicit `null` differently.

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{BinarySensorDescriptor, Catalog, SensorDescriptor};
use crate::error::CoreError;
use crate::publish::PublishSink;
use crate::topics::{Component, Topics};

const MANUFACTURER: &str = "Metro Therm";
const MODEL: &str = "SHK200S";

/// Device block shared by every entity of one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    /// A single string on the wire, not a list.
    pub identifiers: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    /// Device named and identified by the root topic.
    pub fn for_topics(topics: &Topics) -> Self {
        Self {
            name: topics.root().to_owned(),
            identifiers: topics.root().to_owned(),
            manufacturer: MANUFACTURER.into(),
            model: MODEL.into(),
        }
    }
}

/// A ready-to-publish discovery config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Serialize)]
struct SensorConfig<'a> {
    name: &'a str,
    unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'a str>,
    state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value_template: Option<&'a str>,
    device: &'a DeviceInfo,
}

#[derive(Serialize)]
struct BinarySensorConfig<'a> {
    name: &'a str,
    unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'a str>,
    state_topic: String,
    payload_on: &'a str,
    payload_off: &'a str,
    device: &'a DeviceInfo,
}

fn sensor_message(
    sensor: &SensorDescriptor,
    topics: &Topics,
    device: &DeviceInfo,
) -> Result<DiscoveryMessage, CoreError> {
    let config = SensorConfig {
        name: sensor.name,
        unique_id: topics.unique_id(sensor.identifier),
        device_class: sensor.device_class,
        state_class: sensor.state_class,
        unit_of_measurement: sensor.unit,
        state_topic: topics.state_topic(sensor.identifier),
        value_template: sensor.value_template,
        device,
    };
    Ok(DiscoveryMessage {
        topic: topics.discovery_topic(Component::Sensor, sensor.identifier),
        payload: serde_json::to_string(&config)?,
    })
}

fn binary_sensor_message(
    sensor: &BinarySensorDescriptor,
    topics: &Topics,
    device: &DeviceInfo,
) -> Result<DiscoveryMessage, CoreError> {
    let config = BinarySensorConfig {
        name: sensor.name,
        unique_id: topics.unique_id(sensor.identifier),
        device_class: sensor.device_class,
        state_topic: topics.state_topic(sensor.identifier),
        payload_on: sensor.payload_on,
        payload_off: sensor.payload_off,
        device,
    };
    Ok(DiscoveryMessage {
        topic: topics.discovery_topic(Component::BinarySensor, sensor.identifier),
        payload: serde_json::to_string(&config)?,
    })
}

/// Build every discovery message for the catalog: sensors first, then
/// binary sensors, each in catalog order.
pub fn discovery_messages(
    catalog: &Catalog,
    topics: &Topics,
    device: &DeviceInfo,
) -> Result<Vec<DiscoveryMessage>, CoreError> {
    let mut messages = Vec::with_capacity(catalog.len());
    for sensor in catalog.sensors() {
        messages.push(sensor_message(sensor, topics, device)?);
    }
    for sensor in catalog.binary_sensors() {
        messages.push(binary_sensor_message(sensor, topics, device)?);
    }
    Ok(messages)
}

/// Publish the full discovery set, retained. Safe to repeat: each call
/// overwrites the same retained topics with the same payloads.
pub async fn publish_discovery<S: PublishSink>(
    sink: &S,
    catalog: &Catalog,
    topics: &Topics,
    device: &DeviceInfo,
) -> Result<usize, CoreError> {
    let messages = discovery_messages(catalog, topics, device)?;
    let count = messages.len();
    for message in messages {
        debug!(topic = %message.topic, "publishing discovery config");
        sink.enqueue(&message.topic, message.payload, true).await?;
    }
    info!(count, "discovery configs published");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;

    fn topics() -> Topics {
        Topics::new("root", "homeassistant")
    }

    fn parse(message: &DiscoveryMessage) -> Value {
        serde_json::from_str(&message.payload).unwrap()
    }

    #[test]
    fn full_sensor_payload() {
        let topics = topics();
        let device = DeviceInfo::for_topics(&topics);
        let sensor = SensorDescriptor {
            name: "Outdoor temperature",
            variable_id: 40004,
            identifier: "outdoor_temperature",
            device_class: Some("temperature"),
            state_class: Some("measurement"),
            unit: Some("°C"),
            value_template: Some("{{ value[:-2] }}"),
        };

        let message = sensor_message(&sensor, &topics, &device).unwrap();
        assert_eq!(
            message.topic,
            "homeassistant/sensor/root/outdoor_temperature/config"
        );
        assert_eq!(
            parse(&message),
            json!({
                "name": "Outdoor temperature",
                "unique_id": "root_outdoor_temperature",
                "device_class": "temperature",
                "state_class": "measurement",
                "unit_of_measurement": "°C",
                "state_topic": "root/sensor/outdoor_temperature",
                "value_template": "{{ value[:-2] }}",
                "device": {
                    "name": "root",
                    "identifiers": "root",
                    "manufacturer": "Metro Therm",
                    "model": "SHK200S"
                }
            })
        );
    }

    #[test]
    fn absent_fields_are_omitted_not_null() {
        let topics = topics();
        let device = DeviceInfo::for_topics(&topics);
        let sensor = SensorDescriptor {
            name: "Compressor starts",
            variable_id: 44069,
            identifier: "compressor_starts",
            device_class: None,
            state_class: Some("total"),
            unit: None,
            value_template: None,
        };

        let message = sensor_message(&sensor, &topics, &device).unwrap();
        assert!(!message.payload.contains("null"), "{}", message.payload);

        let value = parse(&message);
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec!["name", "unique_id", "state_class", "state_topic", "device"]
        );
    }

    #[test]
    fn binary_sensor_payload() {
        let topics = topics();
        let device = DeviceInfo::for_topics(&topics);
        let sensor = BinarySensorDescriptor {
            name: "Defrosting",
            variable_id: 44703,
            identifier: "defrosting",
            device_class: Some("running"),
            payload_on: "yes",
            payload_off: "no",
        };

        let message = binary_sensor_message(&sensor, &topics, &device).unwrap();
        assert_eq!(
            message.topic,
            "homeassistant/binary_sensor/root/defrosting/config"
        );
        assert_eq!(
            parse(&message),
            json!({
                "name": "Defrosting",
                "unique_id": "root_defrosting",
                "device_class": "running",
                "state_topic": "root/sensor/defrosting",
                "payload_on": "yes",
                "payload_off": "no",
                "device": {
                    "name": "root",
                    "identifiers": "root",
                    "manufacturer": "Metro Therm",
                    "model": "SHK200S"
                }
            })
        );
    }

    #[test]
    fn builtin_catalog_yields_one_message_per_entry() {
        let topics = topics();
        let device = DeviceInfo::for_topics(&topics);
        let catalog = Catalog::builtin();
        let messages = discovery_messages(&catalog, &topics, &device).unwrap();
        assert_eq!(messages.len(), catalog.len());
        assert!(
            messages
                .last()
                .unwrap()
                .topic
                .starts_with("homeassistant/binary_sensor/")
        );
    }
}
