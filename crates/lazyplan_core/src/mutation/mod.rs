//! Optimistic mutations: apply locally now, confirm or roll back later.
//!
//! # Responsibility
//! - Define the shared mutation contract (`validate`, `apply_local`, `remote`)
//!   and the single snapshot-driven rollback used by every mutation kind.
//! - Provide the concrete note and scheduled-item mutations.
//!
//! # Invariants
//! - Validation runs before any local state is touched; a rejected mutation
//!   leaves state unchanged and issues no remote call.
//! - The local change is applied before the remote call is first polled.
//! - A failed mutation restores the pre-mutation snapshot, unless a newer
//!   request for the same entity supersedes it under `StalePolicy::LatestWins`.

pub mod item_ops;
pub mod note_ops;
pub mod optimistic;
pub mod pending;

use crate::model::ids::LocalId;
use crate::remote::{RemoteEntry, RemoteError, RemoteNote};
use pending::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use optimistic::{Mutation, OptimisticMutator};
pub use pending::{
    GenerationTracker, MutationOp, PendingMutation, RollbackSnapshot, SettledRequest, StalePolicy,
};

/// Input rejected before any optimistic change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Note content is blank after trim.
    EmptyContent,
    /// Item title is blank after trim.
    EmptyTitle,
    /// Target entity is not in local state.
    UnknownEntity { kind: EntityKind, id: LocalId },
    /// Target still carries a temporary id; the remote store cannot address it.
    Unconfirmed { kind: EntityKind, id: LocalId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "note content must not be blank"),
            Self::EmptyTitle => write!(f, "item title must not be blank"),
            Self::UnknownEntity { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Unconfirmed { kind, id } => {
                write!(f, "{kind} {id} is not confirmed by the remote store yet")
            }
        }
    }
}

impl Error for ValidationError {}

/// Failure of one optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    Validation(ValidationError),
    /// Remote call failed; local state has been rolled back.
    Remote(RemoteError),
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MutationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Remote(err) => Some(err),
        }
    }
}

impl From<ValidationError> for MutationError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RemoteError> for MutationError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

/// Successful remote response, carrying server-canonical data for creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Ack,
    Note(RemoteNote),
    Entry(RemoteEntry),
}

/// Why a settlement left local state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// A newer request for the same entity was issued after this one.
    Superseded,
    /// The temporary id the response refers to is no longer in local state.
    StaleId,
}

/// Outcome of settling one pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Confirmed; carries the entity's id after confirmation.
    Applied(LocalId),
    RolledBack,
    Discarded(DiscardReason),
}
