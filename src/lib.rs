//! # mqttbot
//!
//! Polls local and remote state sources and republishes what they say as
//! retained MQTT facts for home automation.
//!
//! The core monitor runs `diskutil appleRAID list -plist` and publishes,
//! under `home/storage/raidstatus`:
//!
//! | suffix          | payload                                        |
//! |-----------------|------------------------------------------------|
//! | `healthy`       | `true` / `false`                               |
//! | `faultyDevices` | comma-separated `<array>/<device>` labels      |
//! | `error`         | last collection or decode error, empty if none |
//! | `update_date`   | RFC 3339 time of the last cycle                |
//!
//! Two optional probes publish e-cargo bike (`mobility/nextbike`) and
//! car-sharing (`mobility/cityflitzer`) availability.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────┐   ┌──────────────┐   ┌─────────┐
//! │ settings │──▶│ runner (interval)  │──▶│ MonitorHandle│──▶│ outputs │
//! └──────────┘   │  raid | probes     │   │  (sdk)       │   │ mqtt,   │
//!                └─────────┬──────────┘   └──────────────┘   │ file,log│
//!                          ▼                                 └─────────┘
//!                 mqttbot-adapters
//!           collect ─▶ decode ─▶ reduce
//! ```
//!
//! - **[`settings`]**: TOML file plus `MQTTBOT_*` environment overrides
//! - **[`runner`]**: the polling loop and per-monitor tasks
//! - **[`announce`]**: Home Assistant discovery configs
//!
//! ## Usage
//!
//! ```bash
//! # Run forever, publishing to the broker from mqttbot.toml
//! mqttbot --config mqttbot.toml
//!
//! # One cycle, log only
//! mqttbot --once --dry-run
//!
//! # Replay a captured listing
//! diskutil appleRAID list -plist > raid.plist
//! mqttbot --once --dry-run --replay raid.plist
//! ```
//!
//! ### As a library
//!
//! ```
//! use mqttbot::runner::{RaidTask, Runner};
//! use mqttbot_adapters::raid::RaidMonitor;
//! use mqttbot_sdk::{Output, Reporter};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let (memory, state) = Output::memory();
//! let reporter = Reporter::builder().output(memory).build();
//!
//! let monitor = RaidMonitor::builder()
//!     .command("sh")
//!     .args(["-c", "exit 1"])
//!     .build();
//! let runner = Runner::new(Duration::from_secs(120))
//!     .with_raid(RaidTask::new(monitor, reporter.register("home/storage/raidstatus"), false));
//!
//! runner.run_cycle().await;
//! assert_eq!(state.get("home/storage/raidstatus/healthy").as_deref(), Some("false"));
//! # });
//! ```

pub mod announce;
pub mod runner;
pub mod settings;

pub use runner::{reporter_from_settings, ProbeTask, RaidTask, Runner};
pub use settings::Settings;
