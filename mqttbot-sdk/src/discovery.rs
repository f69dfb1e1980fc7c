//! Home Assistant MQTT discovery.
//!
//! Each entity is announced with a retained JSON config on
//! `<discovery-prefix>/<component>/<unique-id>/config`.

use mqttbot_types::Fact;
use serde::Serialize;

/// Device block shared by every entity of one bot.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub identifiers: Vec<String>,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub sw_version: String,
}

impl Device {
    /// Device describing this build of mqttbot.
    pub fn mqttbot(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            identifiers: vec![name.clone()],
            manufacturer: "mqttbot".to_string(),
            model: "mqttbot".to_string(),
            name,
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Entity kinds used by the monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// `"true"`/`"false"` state.
    BinarySensor,
    /// Free text state.
    Sensor,
}

impl Component {
    /// Path segment in the discovery topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::BinarySensor => "binary_sensor",
            Component::Sensor => "sensor",
        }
    }
}

/// Configuration of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct SensorConfig {
    #[serde(skip)]
    pub component: Component,
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub device: Device,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<String>,
}

impl SensorConfig {
    /// A text sensor.
    pub fn sensor(
        name: impl Into<String>,
        unique_id: impl Into<String>,
        state_topic: impl Into<String>,
        device: Device,
    ) -> Self {
        Self {
            component: Component::Sensor,
            name: name.into(),
            unique_id: unique_id.into(),
            state_topic: state_topic.into(),
            device,
            device_class: None,
            entity_category: None,
            payload_on: None,
            payload_off: None,
        }
    }

    /// A binary sensor reading the `"true"`/`"false"` payloads.
    pub fn binary_sensor(
        name: impl Into<String>,
        unique_id: impl Into<String>,
        state_topic: impl Into<String>,
        device: Device,
    ) -> Self {
        Self {
            component: Component::BinarySensor,
            payload_on: Some("true".to_string()),
            payload_off: Some("false".to_string()),
            ..Self::sensor(name, unique_id, state_topic, device)
        }
    }

    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    pub fn with_entity_category(mut self, category: impl Into<String>) -> Self {
        self.entity_category = Some(category.into());
        self
    }

    /// Topic the config is announced on.
    pub fn config_topic(&self, discovery_prefix: &str) -> String {
        format!(
            "{}/{}/{}/config",
            discovery_prefix.trim_end_matches('/'),
            self.component.as_str(),
            self.unique_id
        )
    }

    /// Retained announcement fact.
    pub fn to_fact(&self, discovery_prefix: &str) -> Result<Fact, serde_json::Error> {
        Ok(Fact::retained(
            self.config_topic(discovery_prefix),
            serde_json::to_string(self)?,
        ))
    }
}
