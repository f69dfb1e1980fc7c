//! Outbound facts and the topic namespaces they are published under.

use alloc::format;
use alloc::string::String;

/// Topic suffixes used by the monitors.
pub mod suffix {
    /// `"true"` / `"false"` health flag of the storage monitor.
    pub const HEALTHY: &str = "healthy";
    /// Comma-joined faulty member labels, or empty.
    pub const FAULTY_DEVICES: &str = "faultyDevices";
    /// Last collection/decode error message, or empty.
    pub const ERROR: &str = "error";
    /// Wall-clock time the last cycle completed (heartbeat).
    pub const UPDATE_DATE: &str = "update_date";
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fact {
    /// Full topic, prefix included.
    pub topic: String,

    /// Text payload.
    pub payload: String,

    /// Whether the broker should keep this as the topic's last value.
    pub retain: bool,
}

impl Fact {
    /// Create a retained fact.
    pub fn retained(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: true,
        }
    }
}

/// A topic namespace, e.g. `home/storage/raidstatus`.
///
/// Trailing slashes are stripped so suffixes always join with exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topic {
    prefix: String,
}

impl Topic {
    /// Create a namespace from a prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    /// The prefix without a trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full topic for a suffix.
    pub fn join(&self, suffix: &str) -> String {
        format!("{}/{}", self.prefix, suffix)
    }

    /// Nested namespace, e.g. `home/storage/raidstatus/arrays/<id>`.
    pub fn child(&self, segment: &str) -> Topic {
        Topic::new(self.join(segment))
    }

    /// Retained fact under this namespace.
    pub fn fact(&self, suffix: &str, payload: impl Into<String>) -> Fact {
        Fact::retained(self.join(suffix), payload)
    }
}

/// Payload text for a boolean flag.
pub fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_join() {
        let topic = Topic::new("home/storage/raidstatus");
        assert_eq!(topic.join(suffix::HEALTHY), "home/storage/raidstatus/healthy");
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let topic = Topic::new("home/storage/raidstatus//");
        assert_eq!(topic.prefix(), "home/storage/raidstatus");
        assert_eq!(topic.join("error"), "home/storage/raidstatus/error");
    }

    #[test]
    fn child_namespace() {
        let topic = Topic::new("home/storage/raidstatus").child("arrays").child("29A2");
        assert_eq!(
            topic.join(suffix::FAULTY_DEVICES),
            "home/storage/raidstatus/arrays/29A2/faultyDevices"
        );
    }

    #[test]
    fn facts_from_topic_are_retained() {
        let fact = Topic::new("mobility/nextbike").fact("e_cargo_available", flag(true));
        assert_eq!(fact.topic, "mobility/nextbike/e_cargo_available");
        assert_eq!(fact.payload, "true");
        assert!(fact.retain);
    }

    #[test]
    fn flag_payloads() {
        assert_eq!(flag(true), "true");
        assert_eq!(flag(false), "false");
    }
}
