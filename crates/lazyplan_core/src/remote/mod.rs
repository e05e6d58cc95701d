//! Remote-store contract consumed by the engine.
//!
//! # Responsibility
//! - Define the wire records and async operations the Today engine needs from
//!   its backing store.
//! - Keep persistence details outside the core.
//!
//! # Invariants
//! - A `false`/`null` result from the collaborator surfaces as
//!   `RemoteError::Rejected`.
//! - Mutating note calls carry `suppress_refresh`; when set, the store must not
//!   trigger its own automatic reload for that call.
//! - Calls are lazy: nothing reaches the store before the returned future is
//!   first polled.

pub mod memory;

use crate::model::catalog::{CatalogEntry, CatalogKind};
use crate::model::ids::ServerId;
use crate::model::schedule::{Slot, SourceRef};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote operation names, used for error reporting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    CreateEntry,
    UpdateEntry,
    DeleteEntry,
    LoadEntries,
    LoadCatalog,
    CreateNote,
    UpdateNote,
    DeleteNote,
    ToggleNotePin,
    LoadNotes,
}

impl RemoteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateEntry => "create_schedule_entry",
            Self::UpdateEntry => "update_schedule_entry",
            Self::DeleteEntry => "delete_schedule_entry",
            Self::LoadEntries => "load_schedule_entries_range",
            Self::LoadCatalog => "load_catalog",
            Self::CreateNote => "create_note",
            Self::UpdateNote => "update_note",
            Self::DeleteNote => "delete_note",
            Self::ToggleNotePin => "toggle_note_pin",
            Self::LoadNotes => "load_notes",
        }
    }
}

impl Display for RemoteOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The store answered but refused the call.
    Rejected { op: RemoteOp },
    /// The addressed record does not exist remotely.
    NotFound { op: RemoteOp, id: ServerId },
    /// Network or store-level failure.
    Transport { op: RemoteOp, message: String },
}

impl RemoteError {
    pub fn op(&self) -> RemoteOp {
        match self {
            Self::Rejected { op } | Self::NotFound { op, .. } | Self::Transport { op, .. } => *op,
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { op } => write!(f, "remote store rejected {op}"),
            Self::NotFound { op, id } => write!(f, "{op}: remote record {id} not found"),
            Self::Transport { op, message } => write!(f, "{op} failed: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Completion status of a schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Ongoing,
    Completed,
}

impl EntryStatus {
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Completed
        } else {
            Self::Ongoing
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Schedule entry as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: ServerId,
    pub slot: Slot,
    pub date: NaiveDate,
    pub status: EntryStatus,
    /// Source-kind tag: `task`, `habit` or `custom`.
    pub source_kind: String,
    #[serde(default)]
    pub task_id: Option<ServerId>,
    #[serde(default)]
    pub habit_id: Option<ServerId>,
    /// Optional display-name override.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Payload for `create_schedule_entry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScheduleEntry {
    pub date: NaiveDate,
    pub slot: Slot,
    pub source: SourceRef,
    pub display_name: Option<String>,
}

/// Partial update for `update_schedule_entry`. `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl EntryPatch {
    pub fn slot(slot: Slot) -> Self {
        Self {
            slot: Some(slot),
            ..Self::default()
        }
    }

    pub fn status(status: EntryStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Note as stored remotely. Timestamps arrive in whatever text form the store
/// emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNote {
    pub id: ServerId,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub pinned: bool,
}

/// Async operations the engine consumes.
///
/// The engine runs single-threaded, so implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn create_schedule_entry(&self, data: NewScheduleEntry) -> RemoteResult<RemoteEntry>;

    async fn update_schedule_entry(&self, id: ServerId, patch: EntryPatch) -> RemoteResult<()>;

    async fn delete_schedule_entry(&self, id: ServerId) -> RemoteResult<()>;

    /// Entries with `start <= date <= end`, grouped by date.
    async fn load_schedule_entries_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RemoteResult<BTreeMap<NaiveDate, Vec<RemoteEntry>>>;

    async fn load_catalog(&self, kind: CatalogKind) -> RemoteResult<Vec<CatalogEntry>>;

    async fn create_note(&self, content: String, suppress_refresh: bool)
        -> RemoteResult<RemoteNote>;

    async fn update_note(
        &self,
        id: ServerId,
        content: String,
        suppress_refresh: bool,
    ) -> RemoteResult<()>;

    async fn delete_note(&self, id: ServerId, suppress_refresh: bool) -> RemoteResult<()>;

    async fn toggle_note_pin(
        &self,
        id: ServerId,
        pinned: bool,
        suppress_refresh: bool,
    ) -> RemoteResult<()>;

    async fn load_notes(&self) -> RemoteResult<Vec<RemoteNote>>;
}
