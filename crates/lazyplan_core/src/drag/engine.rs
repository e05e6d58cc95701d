//! Drag phases and drop classification.
//!
//! # Invariants
//! - `finish` and `cancel` always return the engine to `Idle`.
//! - `classify` resolves the key against the source list before producing a
//!   plan; any mismatch aborts the whole drop.

use super::key::DragKey;
use crate::model::catalog::{CatalogEntry, CatalogKind};
use crate::model::ids::LocalId;
use crate::model::schedule::Slot;
use crate::state::TodayState;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A list an element can be dragged from or dropped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Catalog(CatalogKind),
    Slot(Slot),
}

impl Display for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog(kind) => write!(f, "catalog:{kind}"),
            Self::Slot(slot) => write!(f, "slot:{slot}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropLocation {
    pub container: Container,
    pub index: usize,
}

impl DropLocation {
    pub fn new(container: Container, index: usize) -> Self {
        Self { container, index }
    }

    pub fn slot(slot: Slot, index: usize) -> Self {
        Self::new(Container::Slot(slot), index)
    }

    pub fn catalog(kind: CatalogKind, index: usize) -> Self {
        Self::new(Container::Catalog(kind), index)
    }
}

/// Drop event as reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragEnd {
    pub key: DragKey,
    pub source: DropLocation,
    /// `None` when the element was released outside any list.
    pub destination: Option<DropLocation>,
}

/// What a drop resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum DragPlan {
    Noop,
    /// Local-only reorder inside one slot.
    Reorder { slot: Slot, from: usize, to: usize },
    /// Slot change, persisted remotely.
    MoveSlot {
        id: LocalId,
        from: Slot,
        to: Slot,
        to_index: usize,
    },
    /// New scheduled instance of a catalog entry.
    Promote {
        entry: CatalogEntry,
        slot: Slot,
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragAbort {
    NotDragging,
    /// Drop reported for a different element than the one being dragged.
    KeyMismatch { started: DragKey, finished: DragKey },
    SourceIndexOutOfBounds {
        container: Container,
        index: usize,
        len: usize,
    },
    /// The element at the source index is not the one the key names.
    UnresolvedId(DragKey),
    /// The key's origin contradicts the reported source container.
    SourceMismatch { key: DragKey, container: Container },
    UnsupportedTarget(Container),
    /// A temp item cannot change slot until its create is confirmed.
    Unconfirmed(LocalId),
}

impl Display for DragAbort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDragging => write!(f, "no drag in progress"),
            Self::KeyMismatch { started, finished } => {
                write!(f, "drag started as {started} but finished as {finished}")
            }
            Self::SourceIndexOutOfBounds {
                container,
                index,
                len,
            } => write!(f, "source index {index} out of bounds for {container} (len {len})"),
            Self::UnresolvedId(key) => write!(f, "drag key {key} does not match its source"),
            Self::SourceMismatch { key, container } => {
                write!(f, "drag key {key} cannot come from {container}")
            }
            Self::UnsupportedTarget(container) => write!(f, "cannot drop into {container}"),
            Self::Unconfirmed(id) => write!(f, "item {id} is not confirmed yet"),
        }
    }
}

impl Error for DragAbort {}

/// Classifies a drop against current state. Pure.
pub fn classify(state: &TodayState, end: &DragEnd) -> Result<DragPlan, DragAbort> {
    let Some(destination) = end.destination else {
        return Ok(DragPlan::Noop);
    };
    if destination == end.source {
        return Ok(DragPlan::Noop);
    }

    match (end.key, end.source.container) {
        (DragKey::Catalog { kind, id }, Container::Catalog(source_kind)) if kind == source_kind => {
            let list = state.catalog.list(kind);
            let entry = list
                .get(end.source.index)
                .ok_or(DragAbort::SourceIndexOutOfBounds {
                    container: end.source.container,
                    index: end.source.index,
                    len: list.len(),
                })?;
            if entry.id != id {
                return Err(DragAbort::UnresolvedId(end.key));
            }
            match destination.container {
                Container::Slot(slot) => Ok(DragPlan::Promote {
                    entry: entry.clone(),
                    slot,
                    index: destination.index,
                }),
                other => Err(DragAbort::UnsupportedTarget(other)),
            }
        }
        (DragKey::Scheduled { slot, id }, Container::Slot(source_slot)) if slot == source_slot => {
            let order = state.order.get(slot);
            let found = order
                .get(end.source.index)
                .ok_or(DragAbort::SourceIndexOutOfBounds {
                    container: end.source.container,
                    index: end.source.index,
                    len: order.len(),
                })?;
            if *found != id || state.item(id).is_none() {
                return Err(DragAbort::UnresolvedId(end.key));
            }
            match destination.container {
                Container::Slot(to) if to == slot => Ok(DragPlan::Reorder {
                    slot,
                    from: end.source.index,
                    to: destination.index.min(order.len() - 1),
                }),
                Container::Slot(_) if id.is_temp() => Err(DragAbort::Unconfirmed(id)),
                Container::Slot(to) => Ok(DragPlan::MoveSlot {
                    id,
                    from: slot,
                    to,
                    to_index: destination.index,
                }),
                other => Err(DragAbort::UnsupportedTarget(other)),
            }
        }
        (key, container) => Err(DragAbort::SourceMismatch { key, container }),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(DragKey),
}

/// Tracks the current drag and classifies its drop.
#[derive(Debug, Default)]
pub struct DragReorderEngine {
    phase: DragPhase,
}

impl DragReorderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    /// Enters `Dragging`. A drag still in progress is replaced.
    pub fn start(&mut self, key: DragKey) {
        if let DragPhase::Dragging(previous) = self.phase {
            warn!(
                "event=drag_start module=drag status=error reason=replaced previous={} key={}",
                previous, key
            );
        }
        self.phase = DragPhase::Dragging(key);
        debug!("event=drag_start module=drag status=ok key={}", key);
    }

    pub fn cancel(&mut self) {
        self.phase = DragPhase::Idle;
    }

    /// Leaves `Dragging` and classifies the drop.
    pub fn finish(&mut self, state: &TodayState, end: &DragEnd) -> Result<DragPlan, DragAbort> {
        let phase = std::mem::take(&mut self.phase);
        let result = match phase {
            DragPhase::Idle => Err(DragAbort::NotDragging),
            DragPhase::Dragging(started) if started != end.key => Err(DragAbort::KeyMismatch {
                started,
                finished: end.key,
            }),
            DragPhase::Dragging(_) => classify(state, end),
        };
        match &result {
            Ok(plan) => debug!(
                "event=drag_finish module=drag status=ok key={} plan={}",
                end.key,
                plan_name(plan)
            ),
            Err(abort) => warn!(
                "event=drag_finish module=drag status=error key={} error={}",
                end.key, abort
            ),
        }
        result
    }
}

fn plan_name(plan: &DragPlan) -> &'static str {
    match plan {
        DragPlan::Noop => "noop",
        DragPlan::Reorder { .. } => "reorder",
        DragPlan::MoveSlot { .. } => "move_slot",
        DragPlan::Promote { .. } => "promote",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        classify, Container, DragAbort, DragEnd, DragPhase, DragPlan, DragReorderEngine,
        DropLocation,
    };
    use crate::drag::key::DragKey;
    use crate::model::catalog::{CatalogEntry, CatalogKind};
    use crate::model::ids::LocalId;
    use crate::model::schedule::{ScheduledItem, Slot, SourceRef};
    use crate::ordering::time_key::TimeComparator;
    use crate::state::TodayState;
    use chrono::NaiveDate;

    fn state() -> TodayState {
        let mut state = TodayState::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            TimeComparator::utc(),
        );
        for (id, title) in [(1, "A"), (2, "B"), (3, "C"), (4, "D")] {
            state.insert_item(
                ScheduledItem::new(LocalId::Server(id), title, Slot::Morning, SourceRef::Custom),
                usize::MAX,
            );
        }
        state.catalog_mut().set(
            CatalogKind::Task,
            vec![
                CatalogEntry::new(1, CatalogKind::Task, "Inbox zero"),
                CatalogEntry::new(2, CatalogKind::Task, "Review"),
            ],
        );
        state
    }

    fn scheduled(id: i64, index: usize, destination: Option<DropLocation>) -> DragEnd {
        DragEnd {
            key: DragKey::scheduled(Slot::Morning, LocalId::Server(id)),
            source: DropLocation::slot(Slot::Morning, index),
            destination,
        }
    }

    #[test]
    fn same_slot_drop_is_a_reorder() {
        let plan = classify(
            &state(),
            &scheduled(1, 0, Some(DropLocation::slot(Slot::Morning, 2))),
        );
        assert_eq!(
            plan,
            Ok(DragPlan::Reorder {
                slot: Slot::Morning,
                from: 0,
                to: 2
            })
        );
    }

    #[test]
    fn reorder_target_is_clamped() {
        let plan = classify(
            &state(),
            &scheduled(1, 0, Some(DropLocation::slot(Slot::Morning, 40))),
        );
        assert_eq!(
            plan,
            Ok(DragPlan::Reorder {
                slot: Slot::Morning,
                from: 0,
                to: 3
            })
        );
    }

    #[test]
    fn no_destination_or_same_spot_is_noop() {
        let state = state();
        assert_eq!(classify(&state, &scheduled(1, 0, None)), Ok(DragPlan::Noop));
        assert_eq!(
            classify(&state, &scheduled(1, 0, Some(DropLocation::slot(Slot::Morning, 0)))),
            Ok(DragPlan::Noop)
        );
    }

    #[test]
    fn catalog_drop_into_slot_promotes_entry() {
        let end = DragEnd {
            key: DragKey::catalog(CatalogKind::Task, 2),
            source: DropLocation::catalog(CatalogKind::Task, 1),
            destination: Some(DropLocation::slot(Slot::Evening, 0)),
        };
        match classify(&state(), &end) {
            Ok(DragPlan::Promote { entry, slot, index }) => {
                assert_eq!(entry.title, "Review");
                assert_eq!(slot, Slot::Evening);
                assert_eq!(index, 0);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn bad_source_index_aborts() {
        let end = DragEnd {
            key: DragKey::catalog(CatalogKind::Task, 2),
            source: DropLocation::catalog(CatalogKind::Task, 9),
            destination: Some(DropLocation::slot(Slot::Evening, 0)),
        };
        assert_eq!(
            classify(&state(), &end),
            Err(DragAbort::SourceIndexOutOfBounds {
                container: Container::Catalog(CatalogKind::Task),
                index: 9,
                len: 2
            })
        );
    }

    #[test]
    fn key_must_match_element_at_source_index() {
        let end = scheduled(2, 0, Some(DropLocation::slot(Slot::Afternoon, 0)));
        assert_eq!(
            classify(&state(), &end),
            Err(DragAbort::UnresolvedId(end.key))
        );
    }

    #[test]
    fn dropping_onto_catalog_is_unsupported() {
        let end = scheduled(1, 0, Some(DropLocation::catalog(CatalogKind::Habit, 0)));
        assert_eq!(
            classify(&state(), &end),
            Err(DragAbort::UnsupportedTarget(Container::Catalog(CatalogKind::Habit)))
        );
    }

    #[test]
    fn finish_without_start_aborts_and_resets() {
        let mut engine = DragReorderEngine::new();
        let end = scheduled(1, 0, Some(DropLocation::slot(Slot::Afternoon, 0)));
        assert_eq!(engine.finish(&state(), &end), Err(DragAbort::NotDragging));

        engine.start(DragKey::scheduled(Slot::Morning, LocalId::Server(2)));
        assert!(matches!(
            engine.finish(&state(), &end),
            Err(DragAbort::KeyMismatch { .. })
        ));
        assert_eq!(engine.phase(), DragPhase::Idle);
    }

    #[test]
    fn cross_slot_drop_moves_item() {
        let mut engine = DragReorderEngine::new();
        let end = scheduled(1, 0, Some(DropLocation::slot(Slot::Afternoon, 0)));
        engine.start(end.key);
        assert!(engine.is_dragging());
        assert_eq!(
            engine.finish(&state(), &end),
            Ok(DragPlan::MoveSlot {
                id: LocalId::Server(1),
                from: Slot::Morning,
                to: Slot::Afternoon,
                to_index: 0
            })
        );
        assert!(!engine.is_dragging());
    }
}
