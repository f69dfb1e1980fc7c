//! The Reporter fans facts out to every configured output.

use std::sync::Arc;

use async_trait::async_trait;
use mqttbot_types::{Fact, Topic};
use tracing::warn;

use crate::handle::MonitorHandle;
use crate::output::Output;
use crate::publish::Publish;
use crate::PublishError;

/// The main entry point for publishing monitor results.
///
/// A Reporter owns the outputs and hands out a [`MonitorHandle`] per topic
/// namespace.
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
///
/// let raid = reporter.register("home/storage/raidstatus");
/// raid.report_flag("healthy", true).await.unwrap();
///
/// assert_eq!(state.get("home/storage/raidstatus/healthy").as_deref(), Some("true"));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Reporter {
    outputs: Arc<Vec<Output>>,
}

impl Reporter {
    /// Create a reporter without outputs. Publishing succeeds and goes nowhere.
    pub fn new() -> Self {
        Self {
            outputs: Arc::new(Vec::new()),
        }
    }

    /// Create a builder for configuring the reporter.
    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::new()
    }

    /// Get a handle publishing under the given topic prefix.
    pub fn register(&self, prefix: &str) -> MonitorHandle {
        MonitorHandle::new(Topic::new(prefix), Arc::new(self.clone()))
    }

    /// Number of configured outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Close every output that holds a connection. Errors are logged.
    pub async fn shutdown(&self) {
        for output in self.outputs.iter() {
            if let Err(e) = output.close().await {
                warn!(error = %e, "failed to close output");
            }
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publish for Reporter {
    /// Deliver to every output in order. The first failure stops delivery
    /// to the remaining outputs.
    async fn publish(&self, fact: Fact) -> Result<(), PublishError> {
        for output in self.outputs.iter() {
            output.emit(&fact).await?;
        }
        Ok(())
    }
}

/// Builder for configuring a Reporter.
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    outputs: Vec<Output>,
}

impl ReporterBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; facts are delivered to all of them in
    /// the order they were added.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Build the reporter.
    pub fn build(self) -> Reporter {
        Reporter {
            outputs: Arc::new(self.outputs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_new() {
        let reporter = Reporter::new();
        let handle = reporter.register("home/storage/raidstatus/");
        assert_eq!(handle.topic().prefix(), "home/storage/raidstatus");
        assert_eq!(reporter.output_count(), 0);
    }

    #[test]
    fn builder_can_add_multiple_outputs() {
        let reporter = Reporter::builder()
            .output(Output::memory().0)
            .output(Output::file("retained.json"))
            .output(Output::Log)
            .build();

        assert_eq!(reporter.output_count(), 3);
    }

    #[tokio::test]
    async fn fans_out_to_every_output() {
        let (first, first_state) = Output::memory();
        let (second, mut rx) = Output::channel(4);
        let reporter = Reporter::builder().output(first).output(second).build();

        reporter
            .publish(Fact::retained("mobility/nextbike/e_cargo_available", "true"))
            .await
            .unwrap();

        assert!(first_state.was_published("mobility/nextbike/e_cargo_available"));
        assert_eq!(rx.recv().await.unwrap().payload, "true");
    }

    #[tokio::test]
    async fn failing_output_stops_delivery() {
        let (closed, rx) = Output::channel(1);
        drop(rx);
        let (memory, state) = Output::memory();
        let reporter = Reporter::builder().output(closed).output(memory).build();

        let result = reporter.publish(Fact::retained("a/b", "c")).await;
        assert!(matches!(result, Err(PublishError::ChannelClosed)));
        assert!(state.history().is_empty());
    }

    #[tokio::test]
    async fn handles_share_outputs() {
        let (memory, state) = Output::memory();
        let reporter = Reporter::builder().output(memory).build();

        let raid = reporter.register("home/storage/raidstatus");
        let bikes = reporter.register("mobility/nextbike");
        raid.publish("error", "").await.unwrap();
        bikes.publish("e_cargo_available", "false").await.unwrap();

        assert_eq!(
            state.topics(),
            vec![
                "home/storage/raidstatus/error".to_string(),
                "mobility/nextbike/e_cargo_available".to_string(),
            ]
        );
        reporter.shutdown().await;
    }
}
