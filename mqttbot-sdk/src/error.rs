//! Error types for publishing.

use std::time::Duration;

use thiserror::Error;

/// A fact could not be delivered to an output.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker URI could not be parsed.
    #[error("invalid broker address `{0}`")]
    InvalidBroker(String),

    /// Unsupported quality-of-service level.
    #[error("invalid QoS level {0} (expected 0, 1 or 2)")]
    InvalidQos(u8),

    /// The MQTT client reported an error.
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// No connection acknowledgement within the timeout.
    #[error("no connection acknowledgement from broker within {0:?}")]
    ConnectTimeout(Duration),

    /// The client's request queue stayed full for the whole timeout.
    #[error("broker client did not accept publish within {0:?}")]
    PublishTimeout(Duration),

    /// Writing the state file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding a payload failed.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The receiving side of a channel output was dropped.
    #[error("channel receiver dropped")]
    ChannelClosed,
}
