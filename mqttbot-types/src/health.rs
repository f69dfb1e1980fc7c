//! Per-array health reduction.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{RaidDocument, RaidSet};

/// Health of one array, derived fresh from a [`RaidDocument`] every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayHealth {
    /// Stable identifier of the array.
    pub id: String,

    /// Human name of the array.
    pub name: String,

    /// True iff the aggregate status equals [`crate::ONLINE`].
    ///
    /// Member statuses never influence this flag.
    pub is_healthy: bool,

    /// Labels of the non-online members, `"<array-name>/<device-name>"`,
    /// in member order. Always empty for a healthy array.
    pub faulty_devices: Vec<String>,
}

impl ArrayHealth {
    /// The faulty labels joined into a single comma-separated payload.
    pub fn faulty_devices_payload(&self) -> String {
        self.faulty_devices.join(",")
    }
}

impl RaidSet {
    /// Compute the health record for this array.
    ///
    /// Member detail is only surfaced when the aggregate status is not
    /// online. Spares are ignored.
    pub fn health(&self) -> ArrayHealth {
        let is_healthy = self.is_online();

        let faulty_devices = if is_healthy {
            Vec::new()
        } else {
            self.members
                .iter()
                .filter(|m| !m.is_online())
                .map(|m| format!("{}/{}", self.name, m.bsd_name))
                .collect()
        };

        ArrayHealth {
            id: self.uuid.clone(),
            name: self.name.clone(),
            is_healthy,
            faulty_devices,
        }
    }
}

impl RaidDocument {
    /// Reduce the document into one health record per array, in order.
    ///
    /// Arrays sharing a name stay distinct entries.
    pub fn reduce(&self) -> Vec<ArrayHealth> {
        self.sets.iter().map(RaidSet::health).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn online_array_is_healthy_regardless_of_members() {
        let document = RaidDocument::builder()
            .set("Data", |s| {
                s.status("Online")
                    .member("disk0", "Failed")
                    .member("disk1", "Rebuilding")
            })
            .build();

        let health = document.reduce();
        assert_eq!(health.len(), 1);
        assert!(health[0].is_healthy);
        assert!(health[0].faulty_devices.is_empty());
        assert_eq!(health[0].faulty_devices_payload(), "");
    }

    #[test]
    fn degraded_array_lists_non_online_members() {
        let document = RaidDocument::builder()
            .set("Data", |s| {
                s.status("Degraded")
                    .member("disk0", "Online")
                    .member("disk1", "Failed")
            })
            .build();

        let health = document.reduce();
        assert!(!health[0].is_healthy);
        assert_eq!(health[0].faulty_devices, vec!["Data/disk1".to_string()]);
        assert_eq!(health[0].faulty_devices_payload(), "Data/disk1");
    }

    #[test]
    fn faulty_members_keep_member_order() {
        let document = RaidDocument::builder()
            .set("Vault", |s| {
                s.status("Offline")
                    .member("disk3", "Failed")
                    .member("disk1", "Online")
                    .member("disk2", "Offline")
            })
            .build();

        let health = document.reduce();
        assert_eq!(
            health[0].faulty_devices,
            vec!["Vault/disk3".to_string(), "Vault/disk2".to_string()]
        );
        assert_eq!(health[0].faulty_devices_payload(), "Vault/disk3,Vault/disk2");
    }

    #[test]
    fn spares_never_appear() {
        let document = RaidDocument::builder()
            .set("Data", |s| {
                s.status("Degraded")
                    .member("disk0", "Failed")
                    .spare("disk9", "Failed")
            })
            .build();

        let health = document.reduce();
        assert_eq!(health[0].faulty_devices, vec!["Data/disk0".to_string()]);
    }

    #[test]
    fn unknown_status_is_not_online() {
        let document = RaidDocument::builder()
            .set("Data", |s| s.status("SomethingNew").member("disk0", "Online"))
            .build();

        let health = document.reduce();
        assert!(!health[0].is_healthy);
        assert!(health[0].faulty_devices.is_empty());
    }

    #[test]
    fn unhealthy_array_without_members() {
        let document = RaidDocument::builder()
            .set("Data", |s| s.status("Degraded"))
            .build();

        let health = document.reduce();
        assert!(!health[0].is_healthy);
        assert!(health[0].faulty_devices.is_empty());
    }

    #[test]
    fn identical_names_are_not_deduplicated() {
        let document = RaidDocument::builder()
            .set("Data", |s| s.uuid("A").status("Degraded").member("disk0", "Failed"))
            .set("Data", |s| s.uuid("B").member("disk0", "Online"))
            .build();

        let health = document.reduce();
        assert_eq!(health.len(), 2);
        assert_eq!(health[0].id, "A");
        assert_eq!(health[1].id, "B");
        assert!(!health[0].is_healthy);
        assert!(health[1].is_healthy);
    }

    #[test]
    fn reduce_is_deterministic() {
        let document = RaidDocument::builder()
            .set("One", |s| s.status("Degraded").member("a", "Failed").member("b", "Offline"))
            .set("Two", |s| s.member("c", "Online"))
            .build();

        assert_eq!(document.reduce(), document.reduce());
    }

    #[test]
    fn empty_document_reduces_to_nothing() {
        assert!(RaidDocument::new().reduce().is_empty());
    }
}
