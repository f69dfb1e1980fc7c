//! MQTT broker output.
//!
//! Facts are published with the configured QoS and their retain flag. The
//! client's event loop runs on a background task which reconnects on
//! failure; [`MqttOutput::connect`] only returns once the broker has
//! acknowledged the first connection.
//!
//! While the broker is unreachable the request queue fills up. A publish
//! that cannot be queued within the publish timeout fails with
//! [`PublishError::PublishTimeout`] instead of blocking the cycle.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mqttbot_sdk::mqtt::{MqttConfig, MqttOutput};
//! use mqttbot_sdk::Output;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MqttConfig::builder()
//!         .host("tcp://10.0.0.9:1883")
//!         .credentials("mqttbot", "secret")
//!         .build();
//!
//!     let output = Output::mqtt(MqttOutput::connect(&config).await?);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use mqttbot_types::Fact;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::PublishError;

const DEFAULT_PORT: u16 = 1883;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const REQUEST_CAPACITY: usize = 64;

/// Connection settings for the broker.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker URI, e.g. `tcp://localhost:1883`.
    pub host: String,
    /// Client identifier.
    pub client_id: String,
    /// Optional user name.
    pub username: Option<String>,
    /// Optional password, only sent together with a user name.
    pub password: Option<String>,
    /// Time to wait for the first connection acknowledgement.
    pub connect_timeout: Duration,
    /// Time a single publish may wait for room in the request queue.
    pub publish_timeout: Duration,
    /// Quality of service for every publish (0, 1 or 2).
    pub qos: u8,
}

impl MqttConfig {
    /// Create a new builder.
    pub fn builder() -> MqttConfigBuilder {
        MqttConfigBuilder::default()
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for MqttConfig.
#[derive(Debug, Default)]
pub struct MqttConfigBuilder {
    host: Option<String>,
    client_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connect_timeout: Option<Duration>,
    publish_timeout: Option<Duration>,
    qos: Option<u8>,
}

impl MqttConfigBuilder {
    /// Set the broker URI (default: "tcp://localhost:1883").
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the client identifier (default: "mqttbot").
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set user name and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the connect timeout (default: 5 seconds).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the publish timeout (default: 10 seconds).
    pub fn publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = Some(timeout);
        self
    }

    /// Set the QoS level (default: 0).
    pub fn qos(mut self, qos: u8) -> Self {
        self.qos = Some(qos);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MqttConfig {
        MqttConfig {
            host: self
                .host
                .unwrap_or_else(|| format!("tcp://localhost:{}", DEFAULT_PORT)),
            client_id: self.client_id.unwrap_or_else(|| "mqttbot".to_string()),
            username: self.username,
            password: self.password,
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(5)),
            publish_timeout: self.publish_timeout.unwrap_or(Duration::from_secs(10)),
            qos: self.qos.unwrap_or(0),
        }
    }
}

/// Split a broker URI into host and port.
///
/// Accepts `host`, `host:port`, and either form behind a `tcp://` or
/// `mqtt://` scheme.
pub fn parse_broker(uri: &str) -> Result<(String, u16), PublishError> {
    let invalid = || PublishError::InvalidBroker(uri.to_string());

    let rest = uri
        .strip_prefix("tcp://")
        .or_else(|| uri.strip_prefix("mqtt://"))
        .unwrap_or(uri)
        .trim_end_matches('/');

    if rest.contains("://") {
        return Err(invalid());
    }

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
        None => (rest, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(invalid());
    }

    Ok((host.to_string(), port))
}

/// Map a numeric QoS level.
pub fn qos_level(qos: u8) -> Result<QoS, PublishError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(PublishError::InvalidQos(other)),
    }
}

/// A connected broker client.
pub struct MqttOutput {
    client: AsyncClient,
    qos: QoS,
    publish_timeout: Duration,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttOutput {
    /// Connect to the broker and wait for its acknowledgement.
    pub async fn connect(config: &MqttConfig) -> Result<Self, PublishError> {
        let (host, port) = parse_broker(&config.host)?;
        let qos = qos_level(config.qos)?;

        let mut options = MqttOptions::new(&config.client_id, host.as_str(), port);
        options.set_keep_alive(KEEP_ALIVE);
        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.clone().unwrap_or_default());
        }

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);

        match tokio::time::timeout(config.connect_timeout, await_connack(&mut event_loop)).await {
            Ok(result) => result?,
            Err(_) => return Err(PublishError::ConnectTimeout(config.connect_timeout)),
        }
        info!(broker = %config.host, client_id = %config.client_id, "connected to MQTT broker");

        let handle = tokio::spawn(drive(event_loop));

        Ok(Self {
            client,
            qos,
            publish_timeout: config.publish_timeout,
            event_loop: Mutex::new(Some(handle)),
        })
    }

    /// Queue one fact for the event loop.
    ///
    /// Returns once the client accepted the request. Broker acknowledgements
    /// for QoS 1 and 2 are handled by the event loop and not awaited here.
    pub async fn publish(&self, fact: &Fact) -> Result<(), PublishError> {
        debug!(topic = %fact.topic, payload = %fact.payload, "publishing to broker");
        let request = self.client.publish(
            fact.topic.clone(),
            self.qos,
            fact.retain,
            fact.payload.clone().into_bytes(),
        );

        match tokio::time::timeout(self.publish_timeout, request).await {
            Ok(result) => result.map_err(|e| PublishError::Mqtt(e.to_string())),
            Err(_) => Err(PublishError::PublishTimeout(self.publish_timeout)),
        }
    }

    /// Disconnect cleanly and stop the event loop.
    pub async fn disconnect(&self) -> Result<(), PublishError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| PublishError::Mqtt(e.to_string()))?;

        let handle = self.event_loop.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(Duration::from_secs(1), handle).await.is_err() {
                debug!("event loop did not stop after disconnect");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MqttOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttOutput")
            .field("qos", &self.qos)
            .field("publish_timeout", &self.publish_timeout)
            .finish()
    }
}

impl Drop for MqttOutput {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.get_mut().take() {
            handle.abort();
        }
    }
}

async fn await_connack(event_loop: &mut EventLoop) -> Result<(), PublishError> {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(PublishError::Mqtt(e.to_string())),
        }
    }
}

// Polling after an error makes the client reconnect.
async fn drive(mut event_loop: EventLoop) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("reconnected to MQTT broker"),
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => break,
            Err(e) => {
                warn!(error = %e, "MQTT connection lost");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
