//! Pinned-first, newest-first note list.
//!
//! # Responsibility
//! - Keep the note list in render order after every local or remote change.
//!
//! # Invariants
//! - List order is always `pinned (updated_at desc) ++ unpinned (updated_at desc)`.
//! - Ties keep their previous relative order (stable sort).
//! - Ids are unique within the list.

use crate::model::ids::LocalId;
use crate::model::note::Note;
use crate::ordering::time_key::TimeComparator;
use std::cmp::Reverse;

/// Sorts `notes` into render order.
pub fn sort_notes(notes: &mut [Note], comparator: &TimeComparator) {
    notes.sort_by_cached_key(|note| {
        (
            Reverse(note.pinned),
            Reverse(comparator.sort_key(&note.updated_at)),
        )
    });
}

/// Returns whether `notes` already satisfies the render-order invariant.
pub fn is_render_ordered(notes: &[Note], comparator: &TimeComparator) -> bool {
    notes.windows(2).all(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        if a.pinned != b.pinned {
            return a.pinned;
        }
        comparator.sort_key(&a.updated_at) >= comparator.sort_key(&b.updated_at)
    })
}

#[derive(Debug, Clone, Default)]
pub struct NoteList {
    notes: Vec<Note>,
    comparator: TimeComparator,
}

impl NoteList {
    pub fn new(comparator: TimeComparator) -> Self {
        Self {
            notes: Vec::new(),
            comparator,
        }
    }

    pub fn from_notes(notes: Vec<Note>, comparator: TimeComparator) -> Self {
        let mut list = Self::new(comparator);
        list.replace_all(notes);
        list
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.notes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn comparator(&self) -> &TimeComparator {
        &self.comparator
    }

    pub fn get(&self, id: LocalId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn contains(&self, id: LocalId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<LocalId> {
        self.notes.iter().map(|note| note.id).collect()
    }

    /// Inserts or replaces `note` by id, then re-sorts. Returns the replaced
    /// note, if any.
    pub fn upsert(&mut self, note: Note) -> Option<Note> {
        let previous = match self.notes.iter().position(|existing| existing.id == note.id) {
            Some(index) => Some(std::mem::replace(&mut self.notes[index], note)),
            None => {
                self.notes.push(note);
                None
            }
        };
        self.resort();
        previous
    }

    /// Applies `edit` to the note with `id`, then re-sorts.
    pub fn update<F>(&mut self, id: LocalId, edit: F) -> bool
    where
        F: FnOnce(&mut Note),
    {
        match self.notes.iter_mut().find(|note| note.id == id) {
            Some(note) => {
                edit(note);
                self.resort();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: LocalId) -> Option<Note> {
        let index = self.notes.iter().position(|note| note.id == id)?;
        Some(self.notes.remove(index))
    }

    /// Replaces the note at `old` with `note` (which carries its new id).
    /// Returns `false` when `old` is no longer present.
    pub fn replace_id(&mut self, old: LocalId, note: Note) -> bool {
        match self.notes.iter().position(|existing| existing.id == old) {
            Some(index) => {
                self.notes[index] = note;
                self.resort();
                true
            }
            None => false,
        }
    }

    /// Replaces the whole list. Later duplicates of an id are dropped.
    pub fn replace_all(&mut self, notes: Vec<Note>) {
        let mut seen = std::collections::HashSet::with_capacity(notes.len());
        self.notes = notes.into_iter().filter(|note| seen.insert(note.id)).collect();
        self.resort();
    }

    fn resort(&mut self) {
        sort_notes(&mut self.notes, &self.comparator);
    }
}
