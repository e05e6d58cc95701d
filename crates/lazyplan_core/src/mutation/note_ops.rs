//! Note mutations.

use super::optimistic::Mutation;
use super::pending::{EntityKind, MutationOp, RollbackSnapshot};
use super::ValidationError;
use crate::model::ids::LocalId;
use crate::model::note::Note;
use crate::state::TodayState;
use chrono::{DateTime, FixedOffset};

fn require_note(state: &TodayState, id: LocalId) -> Result<&Note, ValidationError> {
    state.notes.get(id).ok_or(ValidationError::UnknownEntity {
        kind: EntityKind::Note,
        id,
    })
}

fn require_confirmed(id: LocalId) -> Result<(), ValidationError> {
    if id.is_temp() {
        return Err(ValidationError::Unconfirmed {
            kind: EntityKind::Note,
            id,
        });
    }
    Ok(())
}

fn require_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}

/// Adds a note under a fresh temporary id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNote {
    pub id: LocalId,
    pub content: String,
}

impl CreateNote {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: LocalId::temp(),
            content: content.into(),
        }
    }
}

impl Mutation for CreateNote {
    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }

    fn op(&self) -> MutationOp {
        MutationOp::Create
    }

    fn validate(&self, _state: &TodayState) -> Result<(), ValidationError> {
        require_content(&self.content)
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        state.notes.upsert(Note::new(self.id, self.content.clone(), now));
        Ok((self.id, RollbackSnapshot::Created))
    }
}

/// Replaces a confirmed note's content and bumps `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditNote {
    pub id: LocalId,
    pub content: String,
}

impl EditNote {
    pub fn new(id: LocalId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }
}

impl Mutation for EditNote {
    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }

    fn op(&self) -> MutationOp {
        MutationOp::Update
    }

    fn validate(&self, state: &TodayState) -> Result<(), ValidationError> {
        require_content(&self.content)?;
        require_note(state, self.id)?;
        require_confirmed(self.id)
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let previous = require_note(state, self.id)?.clone();
        state.notes.update(self.id, |note| {
            note.content = self.content.clone();
            note.updated_at = now.into();
        });
        Ok((self.id, RollbackSnapshot::Note(previous)))
    }
}

/// Pins or unpins a confirmed note. `updated_at` is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetNotePin {
    pub id: LocalId,
    pub pinned: bool,
}

impl SetNotePin {
    pub fn new(id: LocalId, pinned: bool) -> Self {
        Self { id, pinned }
    }
}

impl Mutation for SetNotePin {
    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }

    fn op(&self) -> MutationOp {
        MutationOp::TogglePin
    }

    fn validate(&self, state: &TodayState) -> Result<(), ValidationError> {
        require_note(state, self.id)?;
        require_confirmed(self.id)
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        _now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let previous = require_note(state, self.id)?.clone();
        let pinned = self.pinned;
        state.notes.update(self.id, |note| note.pinned = pinned);
        Ok((self.id, RollbackSnapshot::Note(previous)))
    }
}

/// Removes a note. A temp note is removed locally only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteNote {
    pub id: LocalId,
}

impl DeleteNote {
    pub fn new(id: LocalId) -> Self {
        Self { id }
    }
}

impl Mutation for DeleteNote {
    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }

    fn op(&self) -> MutationOp {
        MutationOp::Delete
    }

    fn validate(&self, state: &TodayState) -> Result<(), ValidationError> {
        require_note(state, self.id).map(|_| ())
    }

    fn apply_local(
        &self,
        state: &mut TodayState,
        _now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError> {
        let removed = state
            .notes
            .remove(self.id)
            .ok_or(ValidationError::UnknownEntity {
                kind: EntityKind::Note,
                id: self.id,
            })?;
        Ok((self.id, RollbackSnapshot::Note(removed)))
    }
}
