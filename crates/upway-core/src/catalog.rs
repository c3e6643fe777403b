// ── Sensor catalog ──
//
// Immutable descriptors for every portal variable the bridge forwards.
// Values are demultiplexed by variable id and published under the
// identifier, so both must be unique across the whole catalog.

use std::collections::HashSet;

use crate::error::CoreError;

/// A numeric measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub name: &'static str,
    pub variable_id: u32,
    /// Topic segment and discovery unique-id suffix.
    pub identifier: &'static str,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub unit: Option<&'static str>,
    pub value_template: Option<&'static str>,
}

/// An on/off state reported as one of two portal strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySensorDescriptor {
    pub name: &'static str,
    pub variable_id: u32,
    pub identifier: &'static str,
    pub device_class: Option<&'static str>,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
}

/// Ordered sensors plus ordered binary sensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    sensors: Vec<SensorDescriptor>,
    binary_sensors: Vec<BinarySensorDescriptor>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate variable ids, duplicate or empty
    /// identifiers, and identifiers that would break a topic (`/`, `+`, `#`).
    pub fn new(
        sensors: Vec<SensorDescriptor>,
        binary_sensors: Vec<BinarySensorDescriptor>,
    ) -> Result<Self, CoreError> {
        let mut ids = HashSet::new();
        let mut identifiers = HashSet::new();

        let entries = sensors
            .iter()
            .map(|s| (s.variable_id, s.identifier))
            .chain(binary_sensors.iter().map(|b| (b.variable_id, b.identifier)));

        for (variable_id, identifier) in entries {
            if identifier.is_empty() || identifier.contains(['/', '+', '#']) {
                return Err(CoreError::Catalog {
                    message: format!("variable {variable_id} has invalid identifier {identifier:?}"),
                });
            }
            if !ids.insert(variable_id) {
                return Err(CoreError::Catalog {
                    message: format!("duplicate variable id {variable_id}"),
                });
            }
            if !identifiers.insert(identifier) {
                return Err(CoreError::Catalog {
                    message: format!("duplicate identifier {identifier:?}"),
                });
            }
        }

        Ok(Self {
            sensors,
            binary_sensors,
        })
    }

    /// The SHK200S variable set.
    pub fn builtin() -> Self {
        Self {
            sensors: BUILTIN_SENSORS.to_vec(),
            binary_sensors: BUILTIN_BINARY_SENSORS.to_vec(),
        }
    }

    pub fn sensors(&self) -> &[SensorDescriptor] {
        &self.sensors
    }

    pub fn binary_sensors(&self) -> &[BinarySensorDescriptor] {
        &self.binary_sensors
    }

    /// Every variable id, sensors first. Order carries no meaning for the
    /// portal.
    pub fn variable_ids(&self) -> Vec<u32> {
        self.sensors
            .iter()
            .map(|s| s.variable_id)
            .chain(self.binary_sensors.iter().map(|b| b.variable_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sensors.len() + self.binary_sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[allow(clippy::too_many_arguments)]
const fn sensor(
    name: &'static str,
    variable_id: u32,
    identifier: &'static str,
    device_class: Option<&'static str>,
    state_class: Option<&'static str>,
    unit: Option<&'static str>,
    value_template: Option<&'static str>,
) -> SensorDescriptor {
    SensorDescriptor {
        name,
        variable_id,
        identifier,
        device_class,
        state_class,
        unit,
        value_template,
    }
}

const TEMPERATURE: Option<&str> = Some("temperature");
const MEASUREMENT: Option<&str> = Some("measurement");
const CELSIUS: Option<&str> = Some("°C");
// Portal values carry their unit as a suffix ("12.5°C", "40%").
const STRIP_TWO: Option<&str> = Some("{{ value[:-2] }}");
const STRIP_ONE: Option<&str> = Some("{{ value[:-1] }}");

const BUILTIN_SENSORS: &[SensorDescriptor] = &[
    sensor("Setpoint temperature", 47398, "setpoint_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Indoor temperature", 40033, "indoor_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Outdoor temperature", 40004, "outdoor_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Slave outdoor temperature", 44362, "slave_outdoor_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Average outdoor temperature", 40067, "avg_outdoor_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Calculated flow temperature", 43009, "calculated_flow_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Calculated flow temperature cooling", 44270, "calculated_flow_temperature_cooling", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Flow temperature", 40071, "flow_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Return temperature", 40152, "return_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Evaporator temperature", 44363, "evaporator_temperature", TEMPERATURE, MEASUREMENT, CELSIUS, STRIP_TWO),
    sensor("Degree minutes", 43005, "degree_minutes", None, MEASUREMENT, Some("DM"), STRIP_TWO),
    sensor("Charge pump speed", 44396, "charge_pump_speed", Some("power_factor"), MEASUREMENT, Some("%"), STRIP_ONE),
    sensor("Compressor operating time", 44071, "compressor_operating_time", Some("duration"), Some("total"), Some("h"), STRIP_ONE),
    sensor("Current compressor frequency", 44701, "current_compressor_freq", Some("frequency"), MEASUREMENT, Some("Hz"), STRIP_TWO),
    sensor("Requested compressor frequency", 40782, "requested_compressor_freq", Some("frequency"), MEASUREMENT, Some("Hz"), STRIP_TWO),
    sensor("Compressor starts", 44069, "compressor_starts", None, Some("total"), None, None),
];

const BUILTIN_BINARY_SENSORS: &[BinarySensorDescriptor] = &[BinarySensorDescriptor {
    name: "Defrosting",
    variable_id: 44703,
    identifier: "defrosting",
    device_class: Some("running"),
    payload_on: "yes",
    payload_off: "no",
}];
