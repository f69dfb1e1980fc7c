//! Decoded view of the storage utility's RAID listing.

use alloc::string::String;
use alloc::vec::Vec;

use crate::ONLINE;

/// Root of a decoded RAID listing.
///
/// Holds the arrays in the order the utility emitted them. The order carries
/// no meaning but is kept so repeated cycles publish identical output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaidDocument {
    /// Arrays in emission order.
    pub sets: Vec<RaidSet>,
}

impl RaidDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> RaidDocumentBuilder {
        RaidDocumentBuilder::new()
    }

    /// Check if the document lists no arrays.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of arrays in the document.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Iterate over all arrays.
    pub fn iter(&self) -> impl Iterator<Item = &RaidSet> {
        self.sets.iter()
    }
}

/// One redundant-storage array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaidSet {
    /// Stable identifier (`AppleRAIDSetUUID`).
    pub uuid: String,

    /// Human name of the array (`Name`).
    pub name: String,

    /// Device node of the array itself (`BSD Name`, e.g. `disk4`).
    pub bsd_name: String,

    /// RAID level (`Level`, e.g. `Mirror`).
    pub level: String,

    /// Aggregate status as reported by the utility.
    ///
    /// This is an open set of strings; only [`ONLINE`] is special.
    pub status: String,

    /// Active member disks in emission order.
    pub members: Vec<Member>,

    /// Standby disks. Never evaluated for health.
    pub spares: Vec<Spare>,
}

impl RaidSet {
    /// Create a builder for a set with the given name.
    pub fn builder(name: impl Into<String>) -> RaidSetBuilder {
        RaidSetBuilder::new(name)
    }

    /// Whether the aggregate status equals the online sentinel.
    pub fn is_online(&self) -> bool {
        self.status == ONLINE
    }
}

/// One member disk of an array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    /// Stable identifier (`AppleRAIDMemberUUID`).
    pub uuid: String,

    /// Short device name (`BSD Name`, e.g. `disk3s2`).
    pub bsd_name: String,

    /// Member status as reported by the utility (`MemberStatus`).
    pub status: String,
}

impl Member {
    /// Create a member with a device name and status.
    pub fn new(bsd_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            uuid: String::new(),
            bsd_name: bsd_name.into(),
            status: status.into(),
        }
    }

    /// Whether this member reports the online sentinel.
    pub fn is_online(&self) -> bool {
        self.status == ONLINE
    }
}

/// Standby disk. Same shape as a member.
pub type Spare = Member;

// ============================================================================
// Builders
// ============================================================================

/// Builder for `RaidDocument`.
#[derive(Debug, Default)]
pub struct RaidDocumentBuilder {
    sets: Vec<RaidSet>,
}

impl RaidDocumentBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an array built using a closure.
    pub fn set<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(RaidSetBuilder) -> RaidSetBuilder,
    {
        self.sets.push(f(RaidSetBuilder::new(name)).build());
        self
    }

    /// Add a pre-built array.
    pub fn raid_set(mut self, set: RaidSet) -> Self {
        self.sets.push(set);
        self
    }

    /// Build the document.
    pub fn build(self) -> RaidDocument {
        RaidDocument { sets: self.sets }
    }
}

/// Builder for `RaidSet`.
#[derive(Debug)]
pub struct RaidSetBuilder {
    set: RaidSet,
}

impl RaidSetBuilder {
    /// Create a new builder for a set with the given name.
    ///
    /// The status defaults to [`ONLINE`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            set: RaidSet {
                name: name.into(),
                status: String::from(ONLINE),
                ..RaidSet::default()
            },
        }
    }

    /// Set the stable identifier.
    pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
        self.set.uuid = uuid.into();
        self
    }

    /// Set the array's own device name.
    pub fn bsd_name(mut self, bsd_name: impl Into<String>) -> Self {
        self.set.bsd_name = bsd_name.into();
        self
    }

    /// Set the RAID level.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.set.level = level.into();
        self
    }

    /// Set the aggregate status.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.set.status = status.into();
        self
    }

    /// Add a member disk.
    pub fn member(mut self, bsd_name: impl Into<String>, status: impl Into<String>) -> Self {
        self.set.members.push(Member::new(bsd_name, status));
        self
    }

    /// Add a spare disk.
    pub fn spare(mut self, bsd_name: impl Into<String>, status: impl Into<String>) -> Self {
        self.set.spares.push(Member::new(bsd_name, status));
        self
    }

    /// Build the set.
    pub fn build(self) -> RaidSet {
        self.set
    }
}
