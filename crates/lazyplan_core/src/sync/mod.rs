//! Reconciliation of freshly loaded remote data into local state.

pub mod reconcile;

pub use reconcile::{
    entry_to_item, note_from_remote, reconcile_entries, reconcile_notes, ReconcileReport,
    UNTITLED,
};
