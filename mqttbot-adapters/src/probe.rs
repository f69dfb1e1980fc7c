//! Availability probes: fetch a list of records, reduce it to one flag.

use async_trait::async_trait;
use tracing::warn;

use crate::AdapterError;

/// Trait for remote availability checks.
///
/// A probe fetches a sequence of records from an API and reduces it to a
/// single boolean which is published under [`topic_prefix`](Self::topic_prefix)
/// as [`flag_suffix`](Self::flag_suffix).
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// One element of the fetched sequence.
    type Record: Send + Sync;

    /// Fetch the current records.
    async fn fetch(&self) -> Result<Vec<Self::Record>, AdapterError>;

    /// Reduce the records to the published flag.
    fn evaluate(&self, records: &[Self::Record]) -> bool;

    /// Topic suffix of the flag, e.g. `e_cargo_available`.
    fn flag_suffix(&self) -> &str;

    /// Topic namespace the probe publishes under.
    fn topic_prefix(&self) -> &str;

    /// Fetch and evaluate. A failed fetch is logged and evaluates as empty.
    async fn check(&self) -> bool {
        match self.fetch().await {
            Ok(records) => self.evaluate(&records),
            Err(e) => {
                warn!(probe = self.flag_suffix(), error = %e, "fetch failed");
                self.evaluate(&[])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Threshold {
        values: Option<Vec<u32>>,
    }

    #[async_trait]
    impl AvailabilityProbe for Threshold {
        type Record = u32;

        async fn fetch(&self) -> Result<Vec<u32>, AdapterError> {
            self.values.clone().ok_or(AdapterError::Timeout)
        }

        fn evaluate(&self, records: &[u32]) -> bool {
            records.iter().any(|v| *v > 10)
        }

        fn flag_suffix(&self) -> &str {
            "above_ten"
        }

        fn topic_prefix(&self) -> &str {
            "test/threshold"
        }
    }

    #[tokio::test]
    async fn check_evaluates_fetched_records() {
        let probe = Threshold {
            values: Some(vec![1, 2, 30]),
        };
        assert!(probe.check().await);

        let probe = Threshold {
            values: Some(vec![1, 2]),
        };
        assert!(!probe.check().await);
    }

    #[tokio::test]
    async fn failed_fetch_evaluates_as_empty() {
        let probe = Threshold { values: None };
        assert!(!probe.check().await);
    }
}
