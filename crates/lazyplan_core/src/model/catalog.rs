//! Catalog entries that can be promoted into a day's schedule.
//!
//! # Responsibility
//! - Hold the two reusable catalog lists (tasks and habits) in display order.
//! - Resolve a dragged catalog row back to its entry.
//!
//! # Invariants
//! - List order is the order the catalog was loaded in; the engine never
//!   reorders catalog lists.

use super::ids::ServerId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Which catalog list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// One-off task definitions.
    Task,
    /// Recurring habit definitions.
    Habit,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 2] = [CatalogKind::Task, CatalogKind::Habit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Habit => "habit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "task" => Some(Self::Task),
            "habit" => Some(Self::Habit),
            _ => None,
        }
    }
}

impl Display for CatalogKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable task/habit definition listed outside the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ServerId,
    pub kind: CatalogKind,
    pub title: String,
    /// Estimated effort, input to the reward policy.
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl CatalogEntry {
    pub fn new(id: ServerId, kind: CatalogKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            estimated_minutes: None,
            multiplier: default_multiplier(),
        }
    }
}

/// Both catalog lists as currently displayed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    tasks: Vec<CatalogEntry>,
    habits: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, kind: CatalogKind) -> &[CatalogEntry] {
        match kind {
            CatalogKind::Task => &self.tasks,
            CatalogKind::Habit => &self.habits,
        }
    }

    /// Replaces one list wholesale.
    pub fn set(&mut self, kind: CatalogKind, entries: Vec<CatalogEntry>) {
        match kind {
            CatalogKind::Task => self.tasks = entries,
            CatalogKind::Habit => self.habits = entries,
        }
    }

    pub fn entry_at(&self, kind: CatalogKind, index: usize) -> Option<&CatalogEntry> {
        self.list(kind).get(index)
    }

    pub fn find(&self, kind: CatalogKind, id: ServerId) -> Option<&CatalogEntry> {
        self.list(kind).iter().find(|entry| entry.id == id)
    }
}
