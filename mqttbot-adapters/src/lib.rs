//! # mqttbot-adapters
//!
//! Collectors that turn external state into the mqttbot data model.
//!
//! ## Supported Sources
//!
//! - **Storage arrays** (`raid` feature, default) - Runs
//!   `diskutil appleRAID list -plist`, decodes the property list and reduces
//!   it to per-array health
//! - **Nextbike** (`nextbike` feature) - E-cargo bike availability at a
//!   home station
//! - **Cityflitzer** (`cityflitzer` feature) - Car-sharing vehicles close to
//!   a location
//!
//! ## Quick Start (storage arrays)
//!
//! ```rust,no_run
//! use mqttbot_adapters::raid::RaidMonitor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let monitor = RaidMonitor::builder().build();
//!
//!     let health = monitor.check().await?;
//!
//!     println!("Checked {} arrays", health.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod probe;

#[cfg(feature = "raid")]
pub mod raid;

#[cfg(feature = "nextbike")]
pub mod nextbike;

#[cfg(feature = "cityflitzer")]
pub mod cityflitzer;

pub use error::{AdapterError, CollectionError, DecodeError};

// Re-export types for convenience
pub use mqttbot_types::{ArrayHealth, Member, RaidDocument, RaidSet};
