//! Note model.
//!
//! # Responsibility
//! - Define the note record held in the Today note list.
//!
//! # Invariants
//! - `created_at` never changes after creation.
//! - `updated_at` moves only on content edits; pin toggles leave it alone.

use super::ids::LocalId;
use crate::ordering::time_key::TimeValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: LocalId,
    pub content: String,
    pub created_at: TimeValue,
    pub updated_at: TimeValue,
    pub pinned: bool,
}

impl Note {
    /// Creates an unpinned note whose timestamps both equal `now`.
    pub fn new(id: LocalId, content: impl Into<String>, now: impl Into<TimeValue>) -> Self {
        let now = now.into();
        Self {
            id,
            content: content.into(),
            created_at: now.clone(),
            updated_at: now,
            pinned: false,
        }
    }
}
