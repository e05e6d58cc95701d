//! Per-slot ordering of scheduled item ids.
//!
//! # Responsibility
//! - Hold one ordered id sequence per slot.
//! - Reconcile freshly loaded ids into an existing order without reshuffling.
//! - Provide the positional edits used by drag-and-drop and rollback.
//!
//! # Invariants
//! - An id appears in at most one slot at a time.
//! - `merge` never replaces an order outright: ids still present keep their
//!   relative order, new ids are appended in fetch order, vanished ids drop.

use crate::model::ids::LocalId;
use crate::model::schedule::Slot;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::hash::Hash;

/// Merges `fresh` into `current`.
///
/// Result is `current ∩ fresh` in current order followed by `fresh \ current`
/// in fresh order. Repeated ids in `fresh` are appended once.
pub fn merge_order<T>(current: &[T], fresh: &[T]) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let fresh_set: HashSet<&T> = fresh.iter().collect();
    let mut seen: HashSet<&T> = HashSet::with_capacity(current.len() + fresh.len());
    let mut merged = Vec::with_capacity(fresh.len());

    for id in current {
        if fresh_set.contains(id) && seen.insert(id) {
            merged.push(id.clone());
        }
    }
    for id in fresh {
        if seen.insert(id) {
            merged.push(id.clone());
        }
    }
    merged
}

/// Positional edit referenced an index outside a slot's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    IndexOutOfBounds { slot: Slot, index: usize, len: usize },
}

impl Display for OrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfBounds { slot, index, len } => {
                write!(f, "index {index} out of bounds for slot {slot} (len {len})")
            }
        }
    }
}

impl Error for OrderError {}

/// Ordered id sequences for the three slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotOrder {
    slots: [Vec<LocalId>; 3],
}

impl SlotOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> &[LocalId] {
        &self.slots[slot.index()]
    }

    pub fn len(&self, slot: Slot) -> usize {
        self.slots[slot.index()].len()
    }

    /// Total ids across all slots.
    pub fn total(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn contains(&self, id: LocalId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the slot and index currently holding `id`.
    pub fn position(&self, id: LocalId) -> Option<(Slot, usize)> {
        Slot::ALL.into_iter().find_map(|slot| {
            self.get(slot)
                .iter()
                .position(|candidate| *candidate == id)
                .map(|index| (slot, index))
        })
    }

    /// Reconciles one slot against freshly loaded ids.
    ///
    /// Fresh ids are first removed from every other slot so a server-side slot
    /// change cannot leave the same id in two slots.
    pub fn merge(&mut self, slot: Slot, fresh: &[LocalId]) {
        let fresh_set: HashSet<&LocalId> = fresh.iter().collect();
        for other in Slot::ALL.into_iter().filter(|other| *other != slot) {
            self.slots[other.index()].retain(|id| !fresh_set.contains(id));
        }
        let merged = merge_order(self.get(slot), fresh);
        self.slots[slot.index()] = merged;
    }

    /// Inserts `id` at `index` (clamped to the slot length), removing it from
    /// wherever it was before. Returns the index actually used.
    pub fn insert(&mut self, slot: Slot, index: usize, id: LocalId) -> usize {
        self.remove(id);
        let order = &mut self.slots[slot.index()];
        let index = index.min(order.len());
        order.insert(index, id);
        index
    }

    pub fn push(&mut self, slot: Slot, id: LocalId) -> usize {
        self.insert(slot, usize::MAX, id)
    }

    /// Removes `id` from whichever slot holds it, returning its old position.
    pub fn remove(&mut self, id: LocalId) -> Option<(Slot, usize)> {
        let (slot, index) = self.position(id)?;
        self.slots[slot.index()].remove(index);
        Some((slot, index))
    }

    /// Moves the id at `from` to `to` within one slot.
    pub fn reorder(&mut self, slot: Slot, from: usize, to: usize) -> Result<(), OrderError> {
        let order = &mut self.slots[slot.index()];
        let len = order.len();
        if from >= len {
            return Err(OrderError::IndexOutOfBounds {
                slot,
                index: from,
                len,
            });
        }
        if to >= len {
            return Err(OrderError::IndexOutOfBounds {
                slot,
                index: to,
                len,
            });
        }
        let id = order.remove(from);
        order.insert(to, id);
        Ok(())
    }

    /// Swaps `old` for `new` in place. Returns `false` when `old` is absent.
    pub fn replace_id(&mut self, old: LocalId, new: LocalId) -> bool {
        match self.position(old) {
            Some((slot, index)) => {
                self.slots[slot.index()][index] = new;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &[LocalId])> + '_ {
        Slot::ALL
            .into_iter()
            .map(move |slot| (slot, self.get(slot)))
    }

    pub fn has_duplicates(&self) -> bool {
        let mut seen = HashSet::new();
        self.slots.iter().flatten().any(|id| !seen.insert(*id))
    }
}
