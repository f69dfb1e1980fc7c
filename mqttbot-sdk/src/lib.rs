//! # mqttbot-sdk
//!
//! Publishing SDK for mqttbot monitors.
//!
//! Monitors get a [`MonitorHandle`] for their topic namespace from a
//! [`Reporter`], which delivers every fact to the configured outputs in
//! order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mqttbot_sdk::{Output, Reporter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let reporter = Reporter::builder()
//!         .output(Output::file("retained.json"))
//!         .output(Output::Log)
//!         .build();
//!
//!     let handle = reporter.register("mobility/nextbike");
//!
//!     // Publishes the flag and then the update_date heartbeat
//!     handle.report_flag("e_cargo_available", true).await.unwrap();
//! }
//! ```
//!
//! ## Features
//!
//! - **Retained facts**: Every monitor fact is published retained
//! - **Multiple outputs**: MQTT broker, JSON state file, memory, channel, log
//! - **Ordered delivery**: Each publish is awaited before the next
//! - **Discovery**: Home Assistant entity announcements

mod error;
mod handle;
mod output;
mod publish;
mod reporter;
mod retained;

pub mod discovery;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use error::PublishError;
pub use handle::{timestamp, MonitorHandle};
pub use output::{Output, StateFile};
pub use publish::Publish;
pub use reporter::{Reporter, ReporterBuilder};
pub use retained::RetainedState;

// Re-export types for convenience
pub use mqttbot_types::{suffix, ArrayHealth, Fact, Topic};
