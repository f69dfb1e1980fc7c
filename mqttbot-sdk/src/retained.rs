//! In-process view of what the broker would retain.

use std::collections::BTreeMap;

use mqttbot_types::Fact;
use parking_lot::RwLock;

/// Last value per topic plus the ordered log of every fact seen.
///
/// Backs the memory output. The history grows with every fact, so this is
/// meant for tests and short-lived embedding; the file output keeps only
/// last values.
#[derive(Debug, Default)]
pub struct RetainedState {
    values: RwLock<BTreeMap<String, String>>,
    history: RwLock<Vec<Fact>>,
}

impl RetainedState {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fact. Only retained facts update the last-value map.
    pub fn record(&self, fact: &Fact) {
        if fact.retain {
            self.values
                .write()
                .insert(fact.topic.clone(), fact.payload.clone());
        }
        self.history.write().push(fact.clone());
    }

    /// Last retained payload of a topic.
    pub fn get(&self, topic: &str) -> Option<String> {
        self.values.read().get(topic).cloned()
    }

    /// Copy of the last-value map.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.read().clone()
    }

    /// Every fact recorded so far, in order.
    pub fn history(&self) -> Vec<Fact> {
        self.history.read().clone()
    }

    /// Topics in the order they were published, repeats included.
    pub fn topics(&self) -> Vec<String> {
        self.history.read().iter().map(|f| f.topic.clone()).collect()
    }

    /// Whether anything was ever published to the topic.
    pub fn was_published(&self, topic: &str) -> bool {
        self.history.read().iter().any(|f| f.topic == topic)
    }

    /// Forget the history but keep the retained values, like a broker
    /// between two cycles.
    pub fn clear_history(&self) {
        self.history.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_value_wins() {
        let state = RetainedState::new();
        state.record(&Fact::retained("a/healthy", "true"));
        state.record(&Fact::retained("a/healthy", "false"));

        assert_eq!(state.get("a/healthy").as_deref(), Some("false"));
        assert_eq!(state.history().len(), 2);
    }

    #[test]
    fn transient_facts_are_not_retained() {
        let state = RetainedState::new();
        state.record(&Fact {
            retain: false,
            ..Fact::retained("a/ping", "1")
        });

        assert!(state.get("a/ping").is_none());
        assert!(state.was_published("a/ping"));
    }

    #[test]
    fn clear_history_keeps_values() {
        let state = RetainedState::new();
        state.record(&Fact::retained("a/faultyDevices", "Data/disk1"));
        state.clear_history();

        assert!(state.topics().is_empty());
        assert_eq!(state.get("a/faultyDevices").as_deref(), Some("Data/disk1"));
        assert_eq!(state.snapshot().len(), 1);
    }
}
