//! Monitor handle for publishing facts under one topic namespace.

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use mqttbot_types::{flag, suffix, ArrayHealth, Topic};
use tracing::debug;

use crate::publish::Publish;
use crate::PublishError;

/// Heartbeat payload: RFC 3339, second precision, `Z` suffix.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A handle for publishing the facts of one monitor.
///
/// Every publish is awaited before the next one starts.
///
/// # Example
///
/// ```rust
/// use mqttbot_sdk::{Output, Reporter};
///
/// # #[tokio::main]
/// # async fn main() {
/// let (memory, state) = Output::memory();
/// let reporter = Reporter::builder().output(memory).build();
/// let handle = reporter.register("mobility/cityflitzer");
///
/// // Publishes the flag, then update_date
/// handle.report_flag("cityflitzer_nearby", false).await.unwrap();
///
/// assert_eq!(state.topics().len(), 2);
/// # }
/// ```
#[derive(Clone)]
pub struct MonitorHandle {
    topic: Topic,
    publisher: Arc<dyn Publish>,
}

impl MonitorHandle {
    /// Create a handle over any publish capability.
    pub fn new(topic: Topic, publisher: Arc<dyn Publish>) -> Self {
        Self { topic, publisher }
    }

    /// The namespace this handle publishes under.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Publish a retained payload to `<prefix>/<suffix>`.
    pub async fn publish(&self, suffix: &str, payload: impl Into<String>) -> Result<(), PublishError> {
        self.publish_to(&self.topic, suffix, payload.into()).await
    }

    async fn publish_to(&self, topic: &Topic, suffix: &str, payload: String) -> Result<(), PublishError> {
        let fact = topic.fact(suffix, payload);
        debug!(topic = %fact.topic, payload = %fact.payload, "fact");
        self.publisher.publish(fact).await
    }

    /// Publish `update_date` with the current time.
    pub async fn heartbeat(&self) -> Result<(), PublishError> {
        self.heartbeat_at(Utc::now()).await
    }

    /// Publish `update_date` with the given time.
    pub async fn heartbeat_at(&self, now: DateTime<Utc>) -> Result<(), PublishError> {
        self.publish(suffix::UPDATE_DATE, timestamp(now)).await
    }

    /// Publish a boolean flag followed by the heartbeat.
    pub async fn report_flag(&self, suffix: &str, value: bool) -> Result<(), PublishError> {
        self.publish(suffix, flag(value)).await?;
        self.heartbeat().await
    }

    /// Publish the outcome of one storage health cycle.
    ///
    /// On error only `healthy=false` and `error` are published so the last
    /// known `faultyDevices` stays retained. On success every entry
    /// publishes its facts in order (plus the per-array namespace when
    /// `per_array` is set). `update_date` always comes last. The first
    /// failed publish aborts the rest of the cycle.
    pub async fn report_raid<E: Display>(
        &self,
        result: &Result<Vec<ArrayHealth>, E>,
        per_array: bool,
    ) -> Result<(), PublishError> {
        match result {
            Err(e) => {
                self.publish(suffix::HEALTHY, flag(false)).await?;
                self.publish(suffix::ERROR, e.to_string()).await?;
            }
            Ok(arrays) => {
                for array in arrays {
                    self.report_array(array).await?;
                    if per_array {
                        self.report_array_namespace(array).await?;
                    }
                }
            }
        }

        self.heartbeat().await
    }

    async fn report_array(&self, array: &ArrayHealth) -> Result<(), PublishError> {
        if array.is_healthy {
            self.publish(suffix::HEALTHY, flag(true)).await?;
            self.publish(suffix::FAULTY_DEVICES, "").await?;
            self.publish(suffix::ERROR, "").await
        } else {
            self.publish(suffix::HEALTHY, flag(false)).await?;
            self.publish(suffix::FAULTY_DEVICES, array.faulty_devices_payload())
                .await
        }
    }

    // `<prefix>/arrays/<uuid>/...`. Names are not unique, so arrays without
    // a usable UUID get no namespace.
    async fn report_array_namespace(&self, array: &ArrayHealth) -> Result<(), PublishError> {
        let Some(key) = array_key(array) else {
            debug!(name = %array.name, "array without usable UUID, skipping per-array topics");
            return Ok(());
        };

        let topic = self.topic.child("arrays").child(key);
        self.publish_to(&topic, suffix::HEALTHY, flag(array.is_healthy).to_string())
            .await?;
        self.publish_to(&topic, suffix::FAULTY_DEVICES, array.faulty_devices_payload())
            .await
    }
}

fn array_key(array: &ArrayHealth) -> Option<&str> {
    let id = array.id.as_str();
    (!id.is_empty() && !id.contains(['/', '+', '#'])).then_some(id)
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("topic", &self.topic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Output, Reporter, RetainedState};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use mqttbot_types::Fact;
    use parking_lot::Mutex;

    const PREFIX: &str = "home/storage/raidstatus";

    fn memory_handle() -> (MonitorHandle, Arc<RetainedState>) {
        let (memory, state) = Output::memory();
        let reporter = Reporter::builder().output(memory).build();
        (reporter.register(PREFIX), state)
    }

    fn suffixes(state: &RetainedState) -> Vec<String> {
        state
            .topics()
            .iter()
            .map(|t| t.trim_start_matches(PREFIX).trim_start_matches('/').to_string())
            .collect()
    }

    fn healthy(name: &str) -> ArrayHealth {
        ArrayHealth {
            id: format!("{}-uuid", name),
            name: name.to_string(),
            is_healthy: true,
            faulty_devices: vec![],
        }
    }

    fn degraded(name: &str, faulty: &[&str]) -> ArrayHealth {
        ArrayHealth {
            id: format!("{}-uuid", name),
            name: name.to_string(),
            is_healthy: false,
            faulty_devices: faulty.iter().map(|d| format!("{}/{}", name, d)).collect(),
        }
    }

    #[test]
    fn timestamp_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp(now), "2024-01-02T03:04:05Z");
    }

    #[tokio::test]
    async fn healthy_array_clears_faults_and_error() {
        let (handle, state) = memory_handle();

        let result: Result<_, String> = Ok(vec![healthy("Backup")]);
        handle.report_raid(&result, false).await.unwrap();

        assert_eq!(suffixes(&state), vec!["healthy", "faultyDevices", "error", "update_date"]);
        assert_eq!(state.get(&format!("{PREFIX}/healthy")).as_deref(), Some("true"));
        assert_eq!(state.get(&format!("{PREFIX}/faultyDevices")).as_deref(), Some(""));
        assert_eq!(state.get(&format!("{PREFIX}/error")).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn degraded_array_reports_faulty_devices() {
        let (handle, state) = memory_handle();

        let result: Result<_, String> = Ok(vec![degraded("Data", &["disk1", "disk2"])]);
        handle.report_raid(&result, false).await.unwrap();

        assert_eq!(suffixes(&state), vec!["healthy", "faultyDevices", "update_date"]);
        assert_eq!(state.get(&format!("{PREFIX}/healthy")).as_deref(), Some("false"));
        assert_eq!(
            state.get(&format!("{PREFIX}/faultyDevices")).as_deref(),
            Some("Data/disk1,Data/disk2")
        );
    }

    #[tokio::test]
    async fn error_keeps_stale_faulty_devices() {
        let (handle, state) = memory_handle();

        let degraded_cycle: Result<_, String> = Ok(vec![degraded("Data", &["disk1"])]);
        handle.report_raid(&degraded_cycle, false).await.unwrap();
        state.clear_history();

        let failed: Result<Vec<ArrayHealth>, _> = Err("`diskutil` exited with exit status: 1");
        handle.report_raid(&failed, false).await.unwrap();

        assert_eq!(suffixes(&state), vec!["healthy", "error", "update_date"]);
        assert_eq!(state.get(&format!("{PREFIX}/healthy")).as_deref(), Some("false"));
        assert_eq!(
            state.get(&format!("{PREFIX}/error")).as_deref(),
            Some("`diskutil` exited with exit status: 1")
        );
        assert_eq!(
            state.get(&format!("{PREFIX}/faultyDevices")).as_deref(),
            Some("Data/disk1")
        );
    }

    #[tokio::test]
    async fn empty_result_only_publishes_heartbeat() {
        let (handle, state) = memory_handle();

        let result: Result<_, String> = Ok(vec![]);
        handle.report_raid(&result, true).await.unwrap();

        assert_eq!(suffixes(&state), vec!["update_date"]);
    }

    #[tokio::test]
    async fn entries_publish_in_order_with_last_writer_winning() {
        let (handle, state) = memory_handle();

        let result: Result<_, String> = Ok(vec![degraded("Data", &["disk1"]), healthy("Backup")]);
        handle.report_raid(&result, false).await.unwrap();

        assert_eq!(
            suffixes(&state),
            vec!["healthy", "faultyDevices", "healthy", "faultyDevices", "error", "update_date"]
        );
        assert_eq!(state.get(&format!("{PREFIX}/healthy")).as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn per_array_topics_follow_each_entry() {
        let (handle, state) = memory_handle();

        let result: Result<_, String> = Ok(vec![degraded("Data", &["disk1"]), healthy("Backup")]);
        handle.report_raid(&result, true).await.unwrap();

        assert_eq!(
            suffixes(&state),
            vec![
                "healthy",
                "faultyDevices",
                "arrays/Data-uuid/healthy",
                "arrays/Data-uuid/faultyDevices",
                "healthy",
                "faultyDevices",
                "error",
                "arrays/Backup-uuid/healthy",
                "arrays/Backup-uuid/faultyDevices",
                "update_date",
            ]
        );
        assert_eq!(
            state.get(&format!("{PREFIX}/arrays/Data-uuid/healthy")).as_deref(),
            Some("false")
        );
        assert_eq!(
            state.get(&format!("{PREFIX}/arrays/Data-uuid/faultyDevices")).as_deref(),
            Some("Data/disk1")
        );
    }

    #[test]
    fn array_key_requires_a_uuid() {
        let mut array = healthy("Data");
        assert_eq!(array_key(&array), Some("Data-uuid"));

        array.id = "a/b".to_string();
        assert_eq!(array_key(&array), None);

        array.id.clear();
        assert_eq!(array_key(&array), None);
    }

    #[tokio::test]
    async fn arrays_sharing_a_name_without_uuid_get_no_namespace() {
        let (handle, state) = memory_handle();

        let mut first = degraded("Data", &["disk1"]);
        let mut second = healthy("Data");
        first.id.clear();
        second.id.clear();
        let result: Result<_, String> = Ok(vec![first, second]);
        handle.report_raid(&result, true).await.unwrap();

        assert!(suffixes(&state).iter().all(|s| !s.starts_with("arrays/")));
        assert_eq!(state.get(&format!("{PREFIX}/healthy")).as_deref(), Some("true"));
    }

    struct FailAfter {
        remaining: Mutex<usize>,
        seen: Mutex<Vec<Fact>>,
    }

    #[async_trait]
    impl Publish for FailAfter {
        async fn publish(&self, fact: Fact) -> Result<(), PublishError> {
            let mut remaining = self.remaining.lock();
            if *remaining == 0 {
                return Err(PublishError::Mqtt("broker went away".to_string()));
            }
            *remaining -= 1;
            self.seen.lock().push(fact);
            Ok(())
        }
    }

    #[tokio::test]
    async fn publish_failure_aborts_cycle() {
        let publisher = Arc::new(FailAfter {
            remaining: Mutex::new(1),
            seen: Mutex::new(Vec::new()),
        });
        let handle = MonitorHandle::new(Topic::new(PREFIX), publisher.clone());

        let result: Result<_, String> = Ok(vec![healthy("Backup")]);
        let err = handle.report_raid(&result, false).await.unwrap_err();

        assert!(matches!(err, PublishError::Mqtt(_)));
        let seen = publisher.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].topic, format!("{PREFIX}/healthy"));
    }

    #[tokio::test]
    async fn report_flag_then_heartbeat() {
        let (memory, state) = Output::memory();
        let reporter = Reporter::builder().output(memory).build();
        let handle = reporter.register("mobility/nextbike");

        handle.report_flag("e_cargo_available", true).await.unwrap();

        let history = state.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].topic, "mobility/nextbike/e_cargo_available");
        assert_eq!(history[0].payload, "true");
        assert_eq!(history[1].topic, "mobility/nextbike/update_date");
        assert!(history[1].payload.ends_with('Z'));
        assert!(history.iter().all(|f| f.retain));
    }
}
