// ── Topic layout ──
//
// State:     {root}/sensor/{identifier}            (both sensor kinds)
// Discovery: {prefix}/{component}/{root}/{identifier}/config
// Unique id: {root}_{identifier}

/// Auto-discovery component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Sensor,
    BinarySensor,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::BinarySensor => "binary_sensor",
        }
    }
}

/// Topic builder for one bridge instance. Surrounding `/` are trimmed from
/// both segments when constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    root: String,
    discovery_prefix: String,
}

impl Topics {
    pub fn new(root: &str, discovery_prefix: &str) -> Self {
        Self {
            root: root.trim_matches('/').to_owned(),
            discovery_prefix: discovery_prefix.trim_matches('/').to_owned(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn discovery_prefix(&self) -> &str {
        &self.discovery_prefix
    }

    /// Where values for `identifier` are published.
    pub fn state_topic(&self, identifier: &str) -> String {
        format!("{}/sensor/{identifier}", self.root)
    }

    /// Where the retained discovery config for `identifier` is published.
    pub fn discovery_topic(&self, component: Component, identifier: &str) -> String {
        format!(
            "{}/{}/{}/{identifier}/config",
            self.discovery_prefix,
            component.as_str(),
            self.root
        )
    }

    pub fn unique_id(&self, identifier: &str) -> String {
        format!("{}_{identifier}", self.root)
    }
}
