//! Storage array health monitor.
//!
//! Runs `diskutil appleRAID list -plist`, decodes the property list and
//! reduces it to one [`ArrayHealth`] per array.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mqttbot_adapters::raid::RaidMonitor;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let monitor = RaidMonitor::builder()
//!         .timeout(Duration::from_secs(10))
//!         .build();
//!
//!     for array in monitor.check().await? {
//!         println!("{}: healthy={}", array.name, array.is_healthy);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod collector;
mod decoder;

use std::sync::Arc;
use std::time::Duration;

use mqttbot_types::{ArrayHealth, RaidDocument};
use tracing::{debug, info};

pub use collector::{
    Collect, CommandCollector, CommandCollectorBuilder, FileCollector, RawOutput, DEFAULT_ARGS,
    DEFAULT_COMMAND, DEFAULT_TIMEOUT,
};
pub use decoder::{decode, RAID_SETS_KEY};

use crate::AdapterError;

/// Collect, decode and reduce pipeline for the storage arrays.
///
/// Holds no state between cycles; every [`check`](Self::check) starts from a
/// fresh listing.
#[derive(Debug, Clone)]
pub struct RaidMonitor {
    collector: Arc<dyn Collect>,
}

impl RaidMonitor {
    /// Create a new builder for a process-backed monitor.
    pub fn builder() -> RaidMonitorBuilder {
        RaidMonitorBuilder::default()
    }

    /// Create a monitor driven by any collector.
    pub fn with_collector(collector: impl Collect + 'static) -> Self {
        Self {
            collector: Arc::new(collector),
        }
    }

    /// Returns a human-readable description of the underlying source.
    pub fn description(&self) -> &str {
        self.collector.description()
    }

    /// Capture the raw listing.
    pub async fn collect(&self) -> Result<RawOutput, AdapterError> {
        Ok(self.collector.collect().await?)
    }

    /// Capture and decode the listing.
    pub async fn document(&self) -> Result<RaidDocument, AdapterError> {
        let raw = self.collect().await?;
        let document = decode(&raw)?;
        debug!(bytes = raw.len(), arrays = document.len(), "decoded RAID listing");
        Ok(document)
    }

    /// Run one full cycle and return the per-array health, in listing order.
    pub async fn check(&self) -> Result<Vec<ArrayHealth>, AdapterError> {
        let document = self.document().await?;
        let health = document.reduce();

        for (set, array) in document.iter().zip(&health) {
            info!(raid = %set.name, status = %set.status, healthy = array.is_healthy, "checked array");
        }

        Ok(health)
    }
}

impl Default for RaidMonitor {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for a [`RaidMonitor`] backed by a [`CommandCollector`].
#[derive(Debug, Default)]
pub struct RaidMonitorBuilder {
    collector: CommandCollectorBuilder,
}

impl RaidMonitorBuilder {
    /// Set the program to run (default: "diskutil").
    pub fn command(mut self, program: impl Into<String>) -> Self {
        self.collector = self.collector.program(program);
        self
    }

    /// Set the argument vector (default: `appleRAID list -plist`).
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collector = self.collector.args(args);
        self
    }

    /// Set the invocation timeout (default: 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.collector = self.collector.timeout(timeout);
        self
    }

    /// Build the monitor.
    pub fn build(self) -> RaidMonitor {
        RaidMonitor::with_collector(self.collector.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectionError, DecodeError};
    use async_trait::async_trait;

    const DEGRADED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>AppleRAIDSets</key>
    <array>
        <dict>
            <key>AppleRAIDSetUUID</key><string>A</string>
            <key>Name</key><string>Backup</string>
            <key>Status</key><string>Online</string>
            <key>Members</key>
            <array>
                <dict>
                    <key>BSD Name</key><string>disk5</string>
                    <key>MemberStatus</key><string>Online</string>
                </dict>
            </array>
        </dict>
        <dict>
            <key>AppleRAIDSetUUID</key><string>B</string>
            <key>Name</key><string>Data</string>
            <key>Status</key><string>Degraded</string>
            <key>Members</key>
            <array>
                <dict>
                    <key>BSD Name</key><string>disk0</string>
                    <key>MemberStatus</key><string>Online</string>
                </dict>
                <dict>
                    <key>BSD Name</key><string>disk1</string>
                    <key>MemberStatus</key><string>Failed</string>
                </dict>
            </array>
        </dict>
    </array>
</dict>
</plist>"#;

    #[derive(Debug)]
    struct FakeCollector(Result<&'static str, ()>);

    #[async_trait]
    impl Collect for FakeCollector {
        async fn collect(&self) -> Result<RawOutput, CollectionError> {
            match self.0 {
                Ok(text) => Ok(RawOutput::from(text)),
                Err(()) => Err(CollectionError::ExitStatus {
                    command: "diskutil".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                }),
            }
        }

        fn description(&self) -> &str {
            "fake"
        }
    }

    #[tokio::test]
    async fn check_reduces_listing() {
        let monitor = RaidMonitor::with_collector(FakeCollector(Ok(DEGRADED)));

        let health = monitor.check().await.unwrap();
        assert_eq!(health.len(), 2);
        assert!(health[0].is_healthy);
        assert_eq!(health[1].name, "Data");
        assert!(!health[1].is_healthy);
        assert_eq!(health[1].faulty_devices_payload(), "Data/disk1");
    }

    #[tokio::test]
    async fn collection_failure_surfaces() {
        let monitor = RaidMonitor::with_collector(FakeCollector(Err(())));

        let err = monitor.check().await.unwrap_err();
        assert!(matches!(err, AdapterError::Collection(_)));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn decode_failure_surfaces() {
        let monitor = RaidMonitor::with_collector(FakeCollector(Ok(
            "<plist version=\"1.0\"><dict><key>Other</key><array/></dict></plist>",
        )));

        let err = monitor.check().await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Decode(DecodeError::MissingContainer(RAID_SETS_KEY))
        ));
    }

    #[tokio::test]
    async fn command_backed_monitor() {
        let monitor = RaidMonitor::builder()
            .command("sh")
            .args(["-c", "printf '<plist version=\"1.0\"><dict><key>AppleRAIDSets</key><array/></dict></plist>'"])
            .build();

        assert!(monitor.description().starts_with("sh -c"));
        assert!(monitor.check().await.unwrap().is_empty());
    }

    #[test]
    fn default_monitor_runs_diskutil() {
        assert_eq!(RaidMonitor::default().description(), "diskutil appleRAID list -plist");
    }
}
