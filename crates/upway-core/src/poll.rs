// ── Poll cycle ──
//
// One value fetch for the whole catalog, demultiplexed by variable id into
// per-sensor state publishes. Sensors drop the portal's "--" placeholder;
// binary sensors forward any present value.

use std::collections::HashMap;

use tracing::{debug, trace};

use upway_api::{PortalSession, VariableValue};

use crate::catalog::Catalog;
use crate::error::CoreError;
use crate::publish::PublishSink;
use crate::topics::Topics;

/// The portal's "no current reading" placeholder.
pub const NO_DATA_SENTINEL: &str = "--";

/// Variable id to raw display string, for the values actually reported.
pub type ValueMap = HashMap<u32, String>;

/// Index a value response by variable id. Records with a null value are
/// treated as absent; if an id repeats, the later record wins.
pub fn value_map(values: Vec<VariableValue>) -> ValueMap {
    values
        .into_iter()
        .filter_map(|v| v.current_value.map(|value| (v.variable_id, value)))
        .collect()
}

/// A planned state publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePublish {
    pub topic: String,
    pub payload: String,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// State messages enqueued.
    pub published: usize,
    /// Catalog entries with no usable value this cycle.
    pub skipped: usize,
}

/// Decide what to publish for one set of values. Returns the publishes in
/// catalog order and the number of entries skipped.
pub fn plan_publishes(
    catalog: &Catalog,
    topics: &Topics,
    values: &ValueMap,
) -> (Vec<StatePublish>, usize) {
    let mut publishes = Vec::with_capacity(catalog.len());
    let mut skipped = 0;

    for sensor in catalog.sensors() {
        match values.get(&sensor.variable_id) {
            Some(value) if value != NO_DATA_SENTINEL => publishes.push(StatePublish {
                topic: topics.state_topic(sensor.identifier),
                payload: value.clone(),
            }),
            _ => {
                trace!(identifier = sensor.identifier, "no reading");
                skipped += 1;
            }
        }
    }

    for sensor in catalog.binary_sensors() {
        match values.get(&sensor.variable_id) {
            Some(value) => publishes.push(StatePublish {
                topic: topics.state_topic(sensor.identifier),
                payload: value.clone(),
            }),
            None => {
                trace!(identifier = sensor.identifier, "no reading");
                skipped += 1;
            }
        }
    }

    (publishes, skipped)
}

/// Fetch every catalog value and enqueue the state publishes, non-retained.
///
/// A fetch failure abandons the cycle before anything is published.
pub async fn run_cycle<S: PublishSink>(
    session: &PortalSession,
    catalog: &Catalog,
    topics: &Topics,
    sink: &S,
) -> Result<PollReport, CoreError> {
    let values = session.fetch_values(&catalog.variable_ids()).await?;
    let values = value_map(values);

    let (publishes, skipped) = plan_publishes(catalog, topics, &values);
    let published = publishes.len();
    for publish in publishes {
        debug!(topic = %publish.topic, payload = %publish.payload, "state");
        sink.enqueue(&publish.topic, publish.payload, false).await?;
    }

    Ok(PollReport { published, skipped })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::{BinarySensorDescriptor, SensorDescriptor};

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                SensorDescriptor {
                    name: "Outdoor temperature",
                    variable_id: 40004,
                    identifier: "outdoor_temperature",
                    device_class: Some("temperature"),
                    state_class: Some("measurement"),
                    unit: Some("°C"),
                    value_template: None,
                },
                SensorDescriptor {
                    name: "Compressor starts",
                    variable_id: 44069,
                    identifier: "compressor_starts",
                    device_class: None,
                    state_class: Some("total"),
                    unit: None,
                    value_template: None,
                },
            ],
            vec![BinarySensorDescriptor {
                name: "Defrosting",
                variable_id: 44703,
                identifier: "defrosting",
                device_class: Some("running"),
                payload_on: "yes",
                payload_off: "no",
            }],
        )
        .unwrap()
    }

    fn value(id: u32, current: Option<&str>) -> VariableValue {
        VariableValue {
            variable_id: id,
            current_value: current.map(str::to_owned),
        }
    }

    fn publish(topic: &str, payload: &str) -> StatePublish {
        StatePublish {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn value_map_drops_nulls_and_keeps_last_duplicate() {
        let map = value_map(vec![
            value(1, Some("a")),
            value(2, None),
            value(1, Some("b")),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&1], "b");
    }

    #[test]
    fn publishes_present_values_in_catalog_order() {
        let topics = Topics::new("root", "ha");
        let values = value_map(vec![
            value(44703, Some("no")),
            value(40004, Some("125")),
            value(44069, Some("4711")),
        ]);

        let (publishes, skipped) = plan_publishes(&catalog(), &topics, &values);
        assert_eq!(
            publishes,
            vec![
                publish("root/sensor/outdoor_temperature", "125"),
                publish("root/sensor/compressor_starts", "4711"),
                publish("root/sensor/defrosting", "no"),
            ]
        );
        assert_eq!(skipped, 0);
    }

    #[test]
    fn sensor_sentinel_is_skipped_but_binary_sentinel_is_forwarded() {
        let topics = Topics::new("root", "ha");
        let values = value_map(vec![
            value(40004, Some(NO_DATA_SENTINEL)),
            value(44703, Some(NO_DATA_SENTINEL)),
        ]);

        let (publishes, skipped) = plan_publishes(&catalog(), &topics, &values);
        assert_eq!(publishes, vec![publish("root/sensor/defrosting", "--")]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn absent_and_null_values_are_skipped_for_both_kinds() {
        let topics = Topics::new("root", "ha");
        let values = value_map(vec![value(40004, None), value(44703, None)]);

        let (publishes, skipped) = plan_publishes(&catalog(), &topics, &values);
        assert!(publishes.is_empty());
        assert_eq!(skipped, 3);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let topics = Topics::new("root", "ha");
        let values = value_map(vec![value(99999, Some("x")), value(40004, Some("1"))]);

        let (publishes, skipped) = plan_publishes(&catalog(), &topics, &values);
        assert_eq!(
            publishes,
            vec![publish("root/sensor/outdoor_temperature", "1")]
        );
        assert_eq!(skipped, 2);
    }
}
