//! In-process implementation of [`RemoteStore`].
//!
//! # Responsibility
//! - Back the CLI demo and the behavioral tests with a complete store.
//! - Record every call and allow per-operation failure injection.
//!
//! # Invariants
//! - Server ids are allocated from one increasing counter shared by entries
//!   and notes.
//! - A mutating note call with `suppress_refresh == false` counts one
//!   automatic refresh, standing in for the reload a real backend triggers.

use super::{
    EntryPatch, EntryStatus, NewScheduleEntry, RemoteEntry, RemoteError, RemoteNote, RemoteOp,
    RemoteResult, RemoteStore,
};
use crate::model::catalog::{CatalogEntry, CatalogKind};
use crate::model::ids::ServerId;
use crate::model::schedule::SourceRef;
use chrono::{NaiveDate, Utc};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f+00";

/// One recorded call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CreateEntry(NewScheduleEntry),
    UpdateEntry { id: ServerId, patch: EntryPatch },
    DeleteEntry(ServerId),
    LoadEntries { start: NaiveDate, end: NaiveDate },
    LoadCatalog(CatalogKind),
    CreateNote { content: String, suppress_refresh: bool },
    UpdateNote { id: ServerId, content: String, suppress_refresh: bool },
    DeleteNote { id: ServerId, suppress_refresh: bool },
    ToggleNotePin { id: ServerId, pinned: bool, suppress_refresh: bool },
    LoadNotes,
}

impl RemoteCall {
    /// Whether this call changes remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::LoadEntries { .. } | Self::LoadCatalog(_) | Self::LoadNotes
        )
    }
}

#[derive(Debug, Default)]
struct MemoryData {
    entries: BTreeMap<ServerId, RemoteEntry>,
    notes: BTreeMap<ServerId, RemoteNote>,
    tasks: Vec<CatalogEntry>,
    habits: Vec<CatalogEntry>,
    last_id: ServerId,
    failing: HashSet<RemoteOp>,
    calls: Vec<RemoteCall>,
    auto_refreshes: usize,
}

impl MemoryData {
    fn next_id(&mut self) -> ServerId {
        self.last_id += 1;
        self.last_id
    }

    fn reserve(&mut self, id: ServerId) {
        self.last_id = self.last_id.max(id);
    }

    fn check(&self, op: RemoteOp) -> RemoteResult<()> {
        if self.failing.contains(&op) {
            return Err(RemoteError::Transport {
                op,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn note_refresh(&mut self, suppress_refresh: bool) {
        if !suppress_refresh {
            self.auto_refreshes += 1;
        }
    }
}

/// Single-threaded store holding entries, notes and catalogs in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RefCell<MemoryData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `op` fail with a transport error.
    pub fn fail(&self, op: RemoteOp) {
        self.data.borrow_mut().failing.insert(op);
    }

    /// Clears an injected failure.
    pub fn recover(&self, op: RemoteOp) {
        self.data.borrow_mut().failing.remove(&op);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.data.borrow().calls.clone()
    }

    /// Recorded calls that change remote state.
    pub fn mutation_calls(&self) -> Vec<RemoteCall> {
        self.data
            .borrow()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.data.borrow_mut().calls.clear();
    }

    pub fn auto_refresh_count(&self) -> usize {
        self.data.borrow().auto_refreshes
    }

    pub fn insert_entry(&self, entry: RemoteEntry) {
        let mut data = self.data.borrow_mut();
        data.reserve(entry.id);
        data.entries.insert(entry.id, entry);
    }

    pub fn insert_note(&self, note: RemoteNote) {
        let mut data = self.data.borrow_mut();
        data.reserve(note.id);
        data.notes.insert(note.id, note);
    }

    pub fn set_catalog(&self, kind: CatalogKind, entries: Vec<CatalogEntry>) {
        let mut data = self.data.borrow_mut();
        match kind {
            CatalogKind::Task => data.tasks = entries,
            CatalogKind::Habit => data.habits = entries,
        }
    }

    pub fn entry(&self, id: ServerId) -> Option<RemoteEntry> {
        self.data.borrow().entries.get(&id).cloned()
    }

    pub fn note(&self, id: ServerId) -> Option<RemoteNote> {
        self.data.borrow().notes.get(&id).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.data.borrow().entries.len()
    }

    pub fn note_count(&self) -> usize {
        self.data.borrow().notes.len()
    }

    fn record(&self, call: RemoteCall) {
        self.data.borrow_mut().calls.push(call);
    }
}

fn now_text() -> String {
    Utc::now().format(DB_TIMESTAMP_FORMAT).to_string()
}

impl RemoteStore for InMemoryStore {
    async fn create_schedule_entry(&self, data: NewScheduleEntry) -> RemoteResult<RemoteEntry> {
        self.record(RemoteCall::CreateEntry(data.clone()));
        let mut store = self.data.borrow_mut();
        store.check(RemoteOp::CreateEntry)?;

        let (task_id, habit_id) = match data.source {
            SourceRef::Catalog {
                kind: CatalogKind::Task,
                id,
            } => (Some(id), None),
            SourceRef::Catalog {
                kind: CatalogKind::Habit,
                id,
            } => (None, Some(id)),
            SourceRef::Custom => (None, None),
        };
        let entry = RemoteEntry {
            id: store.next_id(),
            slot: data.slot,
            date: data.date,
            status: EntryStatus::Ongoing,
            source_kind: data.source.tag().to_string(),
            task_id,
            habit_id,
            display_name: data.display_name,
        };
        store.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update_schedule_entry(&self, id: ServerId, patch: EntryPatch) -> RemoteResult<()> {
        self.record(RemoteCall::UpdateEntry {
            id,
            patch: patch.clone(),
        });
        let mut store = self.data.borrow_mut();
        store.check(RemoteOp::UpdateEntry)?;
        let entry = store.entries.get_mut(&id).ok_or(RemoteError::NotFound {
            op: RemoteOp::UpdateEntry,
            id,
        })?;
        if let Some(slot) = patch.slot {
            entry.slot = slot;
        }
        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(name) = patch.display_name {
            entry.display_name = Some(name);
        }
        Ok(())
    }

    async fn delete_schedule_entry(&self, id: ServerId) -> RemoteResult<()> {
        self.record(RemoteCall::DeleteEntry(id));
        let mut store = self.data.borrow_mut();
        store.check(RemoteOp::DeleteEntry)?;
        store
            .entries
            .remove(&id)
            .map(|_| ())
            .ok_or(RemoteError::NotFound {
                op: RemoteOp::DeleteEntry,
                id,
            })
    }

    async fn load_schedule_entries_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RemoteResult<BTreeMap<NaiveDate, Vec<RemoteEntry>>> {
        self.record(RemoteCall::LoadEntries { start, end });
        let store = self.data.borrow();
        store.check(RemoteOp::LoadEntries)?;
        let mut by_date: BTreeMap<NaiveDate, Vec<RemoteEntry>> = BTreeMap::new();
        for entry in store.entries.values() {
            if entry.date >= start && entry.date <= end {
                by_date.entry(entry.date).or_default().push(entry.clone());
            }
        }
        Ok(by_date)
    }

    async fn load_catalog(&self, kind: CatalogKind) -> RemoteResult<Vec<CatalogEntry>> {
        self.record(RemoteCall::LoadCatalog(kind));
        let store = self.data.borrow();
        store.check(RemoteOp::LoadCatalog)?;
        Ok(match kind {
            CatalogKind::Task => store.tasks.clone(),
            CatalogKind::Habit => store.habits.clone(),
        })
    }

    async fn create_note(
        &self,
        content: String,
        suppress_refresh: bool,
    ) -> RemoteResult<RemoteNote> {
        self.record(RemoteCall::CreateNote {
            content: content.clone(),
            suppress_refresh,
        });
        let mut store = self.data.borrow_mut();
        store.check(RemoteOp::CreateNote)?;
        let now = now_text();
        let note = RemoteNote {
            id: store.next_id(),
            content,
            created_at: now.clone(),
            updated_at: now,
            pinned: false,
        };
        store.notes.insert(note.id, note.clone());
        store.note_refresh(suppress_refresh);
        Ok(note)
    }

    async fn update_note(
        &self,
        id: ServerId,
        content: String,
        suppress_refresh: bool,
    ) -> RemoteResult<()> {
        self.record(RemoteCall::UpdateNote {
            id,
            content: content.clone(),
            suppress_refresh,
        });
        let mut store = self.data.borrow_mut();
        store.check(RemoteOp::UpdateNote)?;
        let note = store.notes.get_mut(&id).ok_or(RemoteError::NotFound {
            op: RemoteOp::UpdateNote,
            id,
        })?;
        note.content = content;
        note.updated_at = now_text();
        store.note_refresh(suppress_refresh);
        Ok(())
    }

    async fn delete_note(&self, id: ServerId, suppress_refresh: bool) -> RemoteResult<()> {
        self.record(RemoteCall::DeleteNote {
            id,
            suppress_refresh,
        });
        let mut store = self.data.borrow_mut();
        store.check(RemoteOp::DeleteNote)?;
        if store.notes.remove(&id).is_none() {
            return Err(RemoteError::NotFound {
                op: RemoteOp::DeleteNote,
                id,
            });
        }
        store.note_refresh(suppress_refresh);
        Ok(())
    }

    async fn toggle_note_pin(
        &self,
        id: ServerId,
        pinned: bool,
        suppress_refresh: bool,
    ) -> RemoteResult<()> {
        self.record(RemoteCall::ToggleNotePin {
            id,
            pinned,
            suppress_refresh,
        });
        let mut store = self.data.borrow_mut();
        store.check(RemoteOp::ToggleNotePin)?;
        let note = store.notes.get_mut(&id).ok_or(RemoteError::NotFound {
            op: RemoteOp::ToggleNotePin,
            id,
        })?;
        note.pinned = pinned;
        store.note_refresh(suppress_refresh);
        Ok(())
    }

    async fn load_notes(&self) -> RemoteResult<Vec<RemoteNote>> {
        self.record(RemoteCall::LoadNotes);
        let store = self.data.borrow();
        store.check(RemoteOp::LoadNotes)?;
        Ok(store.notes.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryStore, RemoteCall};
    use crate::model::schedule::{Slot, SourceRef};
    use crate::remote::{EntryPatch, NewScheduleEntry, RemoteError, RemoteOp, RemoteStore};
    use chrono::NaiveDate;
    use futures::executor::block_on;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn create_then_load_groups_by_date() {
        let store = InMemoryStore::new();
        let created = block_on(store.create_schedule_entry(NewScheduleEntry {
            date: day(),
            slot: Slot::Morning,
            source: SourceRef::Custom,
            display_name: Some("Stretch".to_string()),
        }))
        .unwrap();
        assert_eq!(created.source_kind, "custom");

        let loaded = block_on(store.load_schedule_entries_range(day(), day())).unwrap();
        assert_eq!(loaded[&day()], vec![created]);
    }

    #[test]
    fn injected_failure_leaves_state_untouched() {
        let store = InMemoryStore::new();
        store.fail(RemoteOp::CreateNote);
        let err = block_on(store.create_note("x".to_string(), true)).unwrap_err();
        assert_eq!(err.op(), RemoteOp::CreateNote);
        assert_eq!(store.note_count(), 0);
        assert_eq!(store.calls().len(), 1);
    }

    #[test]
    fn unsuppressed_note_calls_count_auto_refreshes() {
        let store = InMemoryStore::new();
        let note = block_on(store.create_note("x".to_string(), false)).unwrap();
        block_on(store.toggle_note_pin(note.id, true, true)).unwrap();
        assert_eq!(store.auto_refresh_count(), 1);
        assert!(store.note(note.id).unwrap().pinned);
    }

    #[test]
    fn update_missing_entry_is_not_found() {
        let store = InMemoryStore::new();
        let err = block_on(store.update_schedule_entry(9, EntryPatch::slot(Slot::Evening)))
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::NotFound {
                op: RemoteOp::UpdateEntry,
                id: 9
            }
        );
        assert!(matches!(store.calls()[0], RemoteCall::UpdateEntry { id: 9, .. }));
    }
}
