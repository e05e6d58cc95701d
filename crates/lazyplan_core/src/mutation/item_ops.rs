//! Scheduled-item mutations.
//!
//! Every edit other than create and delete needs a confirmed (server) id, since
//! the remote update addresses the entry by it.

use super::optimistic::Mutation;
use super::pending::{EntityKind, MutationOp, RollbackSnapshot};
use super::ValidationError;
use crate::model::catalog::CatalogEntry;
use crate::model::ids::LocalId;
use crate::model::schedule::{ScheduledItem, Slot, SourceRef};
use crate::state::TodayState;
use chrono::{DateTime, FixedOffset};

fn require_item(state: &TodayState, id: LocalId) -> Result<&ScheduledItem, ValidationError> {
    state.item(id).ok_or(ValidationError::UnknownEntity {
        kind: EntityKind::ScheduledItem,
        id,
    })
}

fn require_confirmed(state: &TodayState, id: LocalId) -> Result<(), ValidationError> {
    require_item(state, id)?;
    if id.is_temp() {
        return Err(ValidationError::Unconfirmed {
            kind: EntityKind::ScheduledItem,
            id,
        });
    }
    Ok(())
}

fn snapshot(state: &TodayState, id: LocalId) -> Result<RollbackSnapshot, ValidationError> {
    let item = require_item(state, id)?.clone();
    Ok(RollbackSnapshot::Item {
        item,
        position: state.order.position(id),
    })
}

/// Adds an item to a slot under a fresh temporary id.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateItem {
    pub id: LocalId,
    pub title: String,
    pub slot: Slot,
    pub source: SourceRef,
    /// Insert position; `None` appends.
    pub index: Option<usize>,
    pub reward: Option<f64>,
}

impl CreateItem {
    pub fn custom(title: impl Into<String>, slot: Slot) -> Self {
        Self {
            id: LocalId::temp(),
            title: title.into(),
            slot,
            source: SourceRef::Custom,
            index: None,
            reward: None,
        }
    }

    /// Instance of a catalog entry, carrying its title.
    pub fn from_catalog(entry: &CatalogEntry, slot: Slot) -> Self {
        Self {
            id: LocalId::temp(),
            title: entry.title.clone(),
            slot,
            source: SourceRef::Catalog {
                kind: entry.kind,
                id: entry.id,
            },
            index: None,
            reward: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_reward(mut self, reward: Option<f64>) -> Self {
        self.reward = reward;
        self
    }

    /// Display-name override sent to the store. Catalog instances send none
    /// so the catalog title stays authoritative.
    pub fn display_name(&self) -> Option<String> {
        match self.source {
            SourceRef::Custom => Some(self.title.clone()),
            SourceRef::Catalog { .. } => None,
        }
    }
}

impl Mutation for CreateItem {
    fn kind(&self) -> EntityKind {
        EntityKind::ScheduledItem
    }

    fn op(&self) -> MutationOp {
        MutationOp::Create
    }

    fn validate(&self, _state: &TodayState) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        _now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let mut item = ScheduledItem::new(self.id, self.title.clone(), self.slot, self.source);
        item.reward = self.reward;
        state.insert_item(item, self.index.unwrap_or(usize::MAX));
        Ok((self.id, RollbackSnapshot::Created))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditItemTitle {
    pub id: LocalId,
    pub title: String,
}

impl EditItemTitle {
    pub fn new(id: LocalId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl Mutation for EditItemTitle {
    fn kind(&self) -> EntityKind {
        EntityKind::ScheduledItem
    }

    fn op(&self) -> MutationOp {
        MutationOp::Update
    }

    fn validate(&self, state: &TodayState) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        require_confirmed(state, self.id)
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        _now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let snapshot = snapshot(state, self.id)?;
        if let Some(item) = state.items.get_mut(&self.id) {
            item.title = self.title.clone();
        }
        Ok((self.id, snapshot))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetItemCompleted {
    pub id: LocalId,
    pub completed: bool,
}

impl SetItemCompleted {
    pub fn new(id: LocalId, completed: bool) -> Self {
        Self { id, completed }
    }
}

impl Mutation for SetItemCompleted {
    fn kind(&self) -> EntityKind {
        EntityKind::ScheduledItem
    }

    fn op(&self) -> MutationOp {
        MutationOp::ToggleComplete
    }

    fn validate(&self, state: &TodayState) -> Result<(), ValidationError> {
        require_confirmed(state, self.id)
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        _now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let snapshot = snapshot(state, self.id)?;
        if let Some(item) = state.items.get_mut(&self.id) {
            item.completed = self.completed;
        }
        Ok((self.id, snapshot))
    }
}

/// Moves an item into `to_slot` at `to_index` (clamped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveItem {
    pub id: LocalId,
    pub to_slot: Slot,
    pub to_index: usize,
}

impl MoveItem {
    pub fn new(id: LocalId, to_slot: Slot, to_index: usize) -> Self {
        Self {
            id,
            to_slot,
            to_index,
        }
    }
}

impl Mutation for MoveItem {
    fn kind(&self) -> EntityKind {
        EntityKind::ScheduledItem
    }

    fn op(&self) -> MutationOp {
        MutationOp::MoveSlot
    }

    fn validate(&self, state: &TodayState) -> Result<(), ValidationError> {
        require_confirmed(state, self.id)
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        _now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let snapshot = snapshot(state, self.id)?;
        state.order.insert(self.to_slot, self.to_index, self.id);
        if let Some(item) = state.items.get_mut(&self.id) {
            item.slot = self.to_slot;
        }
        Ok((self.id, snapshot))
    }
}

/// Removes an item. A temp item is removed locally only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteItem {
    pub id: LocalId,
}

impl DeleteItem {
    pub fn new(id: LocalId) -> Self {
        Self { id }
    }
}

impl Mutation for DeleteItem {
    fn kind(&self) -> EntityKind {
        EntityKind::ScheduledItem
    }

    fn op(&self) -> MutationOp {
        MutationOp::Delete
    }

    fn validate(&self, state: &TodayState) -> Result<(), ValidationError> {
        require_item(state, self.id).map(|_| ())
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        _now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let (item, position) = state
            .remove_item(self.id)
            .ok_or(ValidationError::UnknownEntity {
                kind: EntityKind::ScheduledItem,
                id: self.id,
            })?;
        Ok((self.id, RollbackSnapshot::Item { item, position }))
    }
}
