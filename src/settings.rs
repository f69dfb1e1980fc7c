//! Layered configuration.
//!
//! An optional TOML file is overlaid by `MQTTBOT_*` environment variables,
//! with `__` separating nested keys:
//!
//! ```text
//! MQTTBOT_MQTT__HOST=tcp://10.0.0.9:1883
//! MQTTBOT_MQTT__PASSWORD=secret
//! MQTTBOT_RAID__ARGS=appleRAID,list,-plist
//! MQTTBOT_NEXTBIKE__ENABLED=true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use mqttbot_adapters::{cityflitzer, nextbike, raid};

/// Prefix of the environment variables.
pub const ENV_PREFIX: &str = "MQTTBOT";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub mqtt: MqttSettings,
    pub raid: RaidSettings,
    pub nextbike: NextbikeSettings,
    pub cityflitzer: CityflitzerSettings,
    pub discovery: DiscoverySettings,
    /// Keep a JSON copy of every retained value in this file.
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub refresh_interval_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 120,
        }
    }
}

impl GeneralSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub host: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
    pub publish_timeout_ms: u64,
    pub qos: u8,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "tcp://localhost:1883".to_string(),
            client_id: "mqttbot".to_string(),
            username: None,
            password: None,
            connect_timeout_ms: 5000,
            publish_timeout_ms: 10_000,
            qos: 0,
        }
    }
}

impl MqttSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Client configuration for the broker output.
    #[cfg(feature = "mqtt")]
    pub fn client_config(&self) -> mqttbot_sdk::mqtt::MqttConfig {
        mqttbot_sdk::mqtt::MqttConfig {
            host: self.host.clone(),
            client_id: self.client_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            connect_timeout: self.connect_timeout(),
            publish_timeout: Duration::from_millis(self.publish_timeout_ms),
            qos: self.qos,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RaidSettings {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
    pub topic_prefix: String,
    /// Also publish `<prefix>/arrays/<id>/...` for every array.
    pub per_array_topics: bool,
    /// Read the listing from this file instead of running the command.
    pub replay_file: Option<PathBuf>,
}

impl Default for RaidSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: raid::DEFAULT_COMMAND.to_string(),
            args: raid::DEFAULT_ARGS.iter().map(|a| a.to_string()).collect(),
            timeout_ms: raid::DEFAULT_TIMEOUT.as_millis() as u64,
            topic_prefix: "home/storage/raidstatus".to_string(),
            per_array_topics: false,
            replay_file: None,
        }
    }
}

impl RaidSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NextbikeSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub country: String,
    pub city: String,
    pub station: i64,
    pub bike_numbers: Vec<String>,
    pub topic_prefix: String,
    pub http_timeout_ms: u64,
}

impl Default for NextbikeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: nextbike::DEFAULT_ENDPOINT.to_string(),
            country: "Germany".to_string(),
            city: "Leipzig".to_string(),
            station: 4101,
            bike_numbers: nextbike::DEFAULT_BIKE_NUMBERS
                .iter()
                .map(|n| n.to_string())
                .collect(),
            topic_prefix: nextbike::DEFAULT_TOPIC_PREFIX.to_string(),
            http_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CityflitzerSettings {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub range: u32,
    pub max_distance: f64,
    pub topic_prefix: String,
    pub http_timeout_ms: u64,
}

impl Default for CityflitzerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: cityflitzer::DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            latitude: 51.32032033409821,
            longitude: 12.36535400104385,
            range: 30_000,
            max_distance: 500.0,
            topic_prefix: cityflitzer::DEFAULT_TOPIC_PREFIX.to_string(),
            http_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub enabled: bool,
    pub prefix: String,
    /// Device name shown in Home Assistant.
    pub device_name: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: "homeassistant".to_string(),
            device_name: "mqttbot".to_string(),
        }
    }
}

/// Environment source with the `MQTTBOT_SECTION__KEY` layout.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("raid.args")
        .with_list_parse_key("nextbike.bike_numbers")
}

impl Settings {
    /// Load from the file (if it exists) and the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, environment())
    }

    /// Load from the file (if it exists) and the given environment source.
    pub fn load_with(path: &Path, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        let settings: Settings = config
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.general.refresh_interval_secs == 0 {
            bail!("general.refresh_interval_secs must be greater than zero");
        }

        if self.mqtt.publish_timeout_ms == 0 {
            bail!("mqtt.publish_timeout_ms must be greater than zero");
        }

        if self.mqtt.qos > 2 {
            bail!("mqtt.qos must be 0, 1 or 2 (got {})", self.mqtt.qos);
        }

        if self.raid.enabled {
            if self.raid.timeout_ms == 0 {
                bail!("raid.timeout_ms must be greater than zero");
            }
            if self.raid.timeout() >= self.general.refresh_interval() {
                bail!(
                    "raid.timeout_ms ({}) must be shorter than the refresh interval ({}s)",
                    self.raid.timeout_ms,
                    self.general.refresh_interval_secs
                );
            }
            if self.raid.replay_file.is_none() && self.raid.command.trim().is_empty() {
                bail!("raid.command must not be empty");
            }
        }

        if self.cityflitzer.enabled && self.cityflitzer.api_key.is_empty() {
            bail!("cityflitzer.api_key is required when cityflitzer is enabled");
        }

        Ok(())
    }
}
