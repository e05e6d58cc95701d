//! Scheduled item model for the Today view.
//!
//! # Responsibility
//! - Define the time-of-day slots and the per-item attributes.
//! - Describe where a scheduled item came from (catalog entry or custom).
//!
//! # Invariants
//! - Order within a slot is not an item attribute; it lives in `SlotOrder`.
//! - `SourceRef::Catalog` always carries the referenced catalog id.

use super::catalog::CatalogKind;
use super::ids::{LocalId, ServerId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Fixed time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Afternoon,
    Evening,
}

impl Slot {
    /// Slots in display order.
    pub const ALL: [Slot; 3] = [Slot::Morning, Slot::Afternoon, Slot::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Morning => 0,
            Self::Afternoon => 1,
            Self::Evening => 2,
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text did not name a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSlot(pub String);

impl Display for UnknownSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown slot: `{}`", self.0)
    }
}

impl Error for UnknownSlot {}

impl FromStr for Slot {
    type Err = UnknownSlot;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            other => Err(UnknownSlot(other.to_string())),
        }
    }
}

/// Origin of a scheduled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceRef {
    /// Instance of a catalog entry.
    Catalog { kind: CatalogKind, id: ServerId },
    /// Free-standing item typed in by the user.
    Custom,
}

impl SourceRef {
    /// Source-kind tag used on the wire (`task|habit|custom`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Catalog { kind, .. } => kind.as_str(),
            Self::Custom => "custom",
        }
    }
}

/// A task instance placed into a slot for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledItem {
    pub id: LocalId,
    pub title: String,
    pub slot: Slot,
    pub source: SourceRef,
    pub completed: bool,
    /// Reward amount copied from the catalog entry at promotion time.
    #[serde(default)]
    pub reward: Option<f64>,
}

impl ScheduledItem {
    pub fn new(id: LocalId, title: impl Into<String>, slot: Slot, source: SourceRef) -> Self {
        Self {
            id,
            title: title.into(),
            slot,
            source,
            completed: false,
            reward: None,
        }
    }
}
