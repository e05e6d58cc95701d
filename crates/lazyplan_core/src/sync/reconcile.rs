//! Reconciliation loader.
//!
//! # Responsibility
//! - Map remote entries and notes into local records.
//! - Fold a fresh load into `TodayState` without disturbing the user's order
//!   or overwriting entities that still have mutations in flight.
//!
//! # Invariants
//! - Item map and note list are replaced wholesale; slot orders are merged.
//! - An entity whose newest in-flight op is a delete stays absent.
//! - Any other in-flight entity keeps its local attributes and slot, including
//!   optimistic creates that the server does not know yet.
//! - Entries dated other than `state.date` are ignored.

use crate::model::catalog::{Catalog, CatalogKind};
use crate::model::ids::LocalId;
use crate::model::note::Note;
use crate::model::schedule::{ScheduledItem, Slot, SourceRef};
use crate::mutation::MutationOp;
use crate::ordering::time_key::TimeValue;
use crate::remote::{RemoteEntry, RemoteNote};
use crate::state::TodayState;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Title used when neither an override nor a catalog title exists.
pub const UNTITLED: &str = "Untitled";

/// Counts describing one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub retained_pending: usize,
    pub skipped_other_dates: usize,
}

pub fn note_from_remote(remote: &RemoteNote) -> Note {
    Note {
        id: LocalId::Server(remote.id),
        content: remote.content.clone(),
        created_at: TimeValue::Text(remote.created_at.clone()),
        updated_at: TimeValue::Text(remote.updated_at.clone()),
        pinned: remote.pinned,
    }
}

/// Maps one remote entry to a scheduled item.
///
/// Title precedence: non-blank display-name override, then the referenced
/// catalog entry's title, then [`UNTITLED`]. Reward is left unset.
pub fn entry_to_item(entry: &RemoteEntry, catalog: &Catalog) -> ScheduledItem {
    let source = source_of(entry);
    let title = entry
        .display_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .or_else(|| match source {
            SourceRef::Catalog { kind, id } => catalog.find(kind, id).map(|e| e.title.clone()),
            SourceRef::Custom => None,
        })
        .unwrap_or_else(|| UNTITLED.to_string());

    ScheduledItem {
        id: LocalId::Server(entry.id),
        title,
        slot: entry.slot,
        source,
        completed: entry.status.is_completed(),
        reward: None,
    }
}

fn source_of(entry: &RemoteEntry) -> SourceRef {
    let Some(kind) = CatalogKind::parse(&entry.source_kind) else {
        if entry.source_kind != "custom" {
            warn!(
                "event=entry_source_unknown module=reconcile status=error entry_id={} source_kind={}",
                entry.id, entry.source_kind
            );
        }
        return SourceRef::Custom;
    };
    let id = match kind {
        CatalogKind::Task => entry.task_id,
        CatalogKind::Habit => entry.habit_id,
    };
    match id {
        Some(id) => SourceRef::Catalog { kind, id },
        None => {
            warn!(
                "event=entry_source_missing_id module=reconcile status=error entry_id={} source_kind={}",
                entry.id, kind
            );
            SourceRef::Custom
        }
    }
}

/// Folds freshly loaded entries into the day's schedule.
///
/// `pending` maps scheduled-item ids to their newest in-flight op.
pub fn reconcile_entries(
    state: &mut TodayState,
    fresh: &[RemoteEntry],
    pending: &HashMap<LocalId, MutationOp>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut next: HashMap<LocalId, ScheduledItem> = HashMap::with_capacity(fresh.len());
    let mut fresh_order: [Vec<LocalId>; 3] = Default::default();

    for entry in fresh {
        if entry.date != state.date {
            report.skipped_other_dates += 1;
            continue;
        }
        let id = LocalId::Server(entry.id);
        if next.contains_key(&id) {
            continue;
        }
        let item = match (pending.get(&id), state.items.get(&id)) {
            (Some(MutationOp::Delete), _) => continue,
            (Some(_), Some(local)) => {
                report.retained_pending += 1;
                local.clone()
            }
            (_, previous) => {
                let mut item = entry_to_item(entry, &state.catalog);
                item.reward = previous.and_then(|local| local.reward);
                item
            }
        };
        fresh_order[item.slot.index()].push(id);
        next.insert(id, item);
    }

    for (id, op) in pending {
        if *op == MutationOp::Delete || next.contains_key(id) {
            continue;
        }
        if let Some(local) = state.items.get(id) {
            report.retained_pending += 1;
            fresh_order[local.slot.index()].push(*id);
            next.insert(*id, local.clone());
        }
    }

    report.added = next.keys().filter(|id| !state.items.contains_key(id)).count();
    report.removed = state.items.keys().filter(|id| !next.contains_key(id)).count();

    state.items = next;
    for slot in Slot::ALL {
        state.order.merge(slot, &fresh_order[slot.index()]);
    }

    debug!(
        "event=reconcile_entries module=reconcile status=ok added={} removed={} retained_pending={} skipped={}",
        report.added, report.removed, report.retained_pending, report.skipped_other_dates
    );
    report
}

/// Folds freshly loaded notes into the note list.
///
/// `pending` maps note ids to their newest in-flight op.
pub fn reconcile_notes(
    state: &mut TodayState,
    fresh: &[RemoteNote],
    pending: &HashMap<LocalId, MutationOp>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut seen: HashSet<LocalId> = HashSet::with_capacity(fresh.len());
    let mut next: Vec<Note> = Vec::with_capacity(fresh.len());

    for remote in fresh {
        let id = LocalId::Server(remote.id);
        if !seen.insert(id) {
            continue;
        }
        match (pending.get(&id), state.notes.get(id)) {
            (Some(MutationOp::Delete), _) => {}
            (Some(_), Some(local)) => {
                report.retained_pending += 1;
                next.push(local.clone());
            }
            _ => next.push(note_from_remote(remote)),
        }
    }

    for (id, op) in pending {
        if *op == MutationOp::Delete || !seen.insert(*id) {
            continue;
        }
        if let Some(local) = state.notes.get(*id) {
            report.retained_pending += 1;
            next.push(local.clone());
        }
    }

    report.added = next.iter().filter(|note| !state.notes.contains(note.id)).count();
    let kept: HashSet<LocalId> = next.iter().map(|note| note.id).collect();
    report.removed = state.notes.iter().filter(|note| !kept.contains(&note.id)).count();

    state.notes.replace_all(next);

    debug!(
        "event=reconcile_notes module=reconcile status=ok added={} removed={} retained_pending={}",
        report.added, report.removed, report.retained_pending
    );
    report
}
