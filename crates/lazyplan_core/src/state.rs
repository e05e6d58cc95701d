//! Local state backing the Today view.
//!
//! # Responsibility
//! - Own the flat item map, per-slot order, note list and catalog for one day.
//! - Offer the small set of item edits that keep map and order in step.
//!
//! # Invariants
//! - Every id in `order` exists in `items` and vice versa.
//! - An id appears in at most one slot.
//! - `ScheduledItem::slot` matches the slot whose order holds the id.

use crate::model::catalog::Catalog;
use crate::model::ids::LocalId;
use crate::model::schedule::{ScheduledItem, Slot};
use crate::ordering::note_order::NoteList;
use crate::ordering::slot_order::SlotOrder;
use crate::ordering::time_key::TimeComparator;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TodayState {
    pub(crate) date: NaiveDate,
    pub(crate) items: HashMap<LocalId, ScheduledItem>,
    pub(crate) order: SlotOrder,
    pub(crate) notes: NoteList,
    pub(crate) catalog: Catalog,
}

impl TodayState {
    pub fn new(date: NaiveDate, comparator: TimeComparator) -> Self {
        Self {
            date,
            items: HashMap::new(),
            order: SlotOrder::new(),
            notes: NoteList::new(comparator),
            catalog: Catalog::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn order(&self) -> &SlotOrder {
        &self.order
    }

    pub fn notes(&self) -> &NoteList {
        &self.notes
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn item(&self, id: LocalId) -> Option<&ScheduledItem> {
        self.items.get(&id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items of one slot in display order.
    pub fn items_in(&self, slot: Slot) -> Vec<&ScheduledItem> {
        self.order
            .get(slot)
            .iter()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    /// Titles of one slot in display order, mostly for tests and the CLI.
    pub fn titles_in(&self, slot: Slot) -> Vec<String> {
        self.items_in(slot)
            .into_iter()
            .map(|item| item.title.clone())
            .collect()
    }

    /// Moves to another day, dropping that day's schedule but keeping notes
    /// and catalog.
    pub fn reset_day(&mut self, date: NaiveDate) {
        self.date = date;
        self.items.clear();
        self.order = SlotOrder::new();
    }

    /// Inserts `item` into its own slot at `index` (clamped). Returns the
    /// index used.
    pub(crate) fn insert_item(&mut self, item: ScheduledItem, index: usize) -> usize {
        let id = item.id;
        let slot = item.slot;
        self.items.insert(id, item);
        self.order.insert(slot, index, id)
    }

    /// Removes an item from both map and order.
    pub(crate) fn remove_item(
        &mut self,
        id: LocalId,
    ) -> Option<(ScheduledItem, Option<(Slot, usize)>)> {
        let item = self.items.remove(&id)?;
        let position = self.order.remove(id);
        Some((item, position))
    }

    /// Re-keys an item, keeping its position.
    pub(crate) fn replace_item_id(&mut self, old: LocalId, mut item: ScheduledItem) -> bool {
        if self.items.remove(&old).is_none() {
            return false;
        }
        let new_id = item.id;
        if let Some((slot, _)) = self.order.position(old) {
            item.slot = slot;
        }
        self.order.replace_id(old, new_id);
        self.items.insert(new_id, item);
        true
    }

    /// Checks the map/order invariants.
    pub fn is_consistent(&self) -> bool {
        if self.order.has_duplicates() || self.order.total() != self.items.len() {
            return false;
        }
        self.order.iter().all(|(slot, ids)| {
            ids.iter()
                .all(|id| self.items.get(id).is_some_and(|item| item.slot == slot))
        })
    }
}
