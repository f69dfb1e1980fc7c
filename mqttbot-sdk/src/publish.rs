//! The injected publish capability.

use async_trait::async_trait;
use mqttbot_types::Fact;

use crate::PublishError;

/// Anything that can deliver a fact.
///
/// Implementations must hand one fact over completely before returning, so
/// that callers awaiting each publish in turn keep per-topic order.
///
/// Success means the backend accepted the fact, not that it reached its
/// final destination. For MQTT that is the client's ordered request queue;
/// no PUBACK is awaited, even at QoS 1 or 2.
#[async_trait]
pub trait Publish: Send + Sync {
    /// Deliver one fact.
    async fn publish(&self, fact: Fact) -> Result<(), PublishError>;
}
