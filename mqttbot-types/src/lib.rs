//! # mqttbot-types
//!
//! Core types for mqttbot. This crate defines the data model shared by the
//! collectors (which decode external tool output into it) and the SDK
//! (which turns it into retained MQTT facts).
//!
//! ## Contents
//!
//! - [`RaidDocument`], [`RaidSet`], [`Member`]: the decoded view of a
//!   `diskutil appleRAID list -plist` dump
//! - [`ArrayHealth`]: the per-array health record produced by
//!   [`RaidDocument::reduce`]
//! - [`Fact`], [`Topic`]: outbound messages and the topic namespaces they
//!   live under
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: Serialization of every type via serde
//!
//! ## Example
//!
//! ```rust
//! use mqttbot_types::RaidDocument;
//!
//! let document = RaidDocument::builder()
//!     .set("Data", |s| {
//!         s.status("Degraded")
//!             .member("disk0", "Online")
//!             .member("disk1", "Failed")
//!     })
//!     .build();
//!
//! let health = document.reduce();
//! assert_eq!(health.len(), 1);
//! assert!(!health[0].is_healthy);
//! assert_eq!(health[0].faulty_devices, vec!["Data/disk1".to_string()]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod fact;
mod health;
mod raid;

pub use fact::*;
pub use health::*;
pub use raid::*;

/// Status string the storage utility reports for a working array or member.
///
/// Every other value (`Degraded`, `Failed`, `Offline`, whatever a future
/// release introduces) counts as not online.
pub const ONLINE: &str = "Online";
