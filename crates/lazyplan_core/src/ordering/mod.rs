//! Ordering primitives for the Today view.
//!
//! # Responsibility
//! - Compare heterogeneous timestamps by recency.
//! - Maintain per-slot item order and the pinned/unpinned note order.
//!
//! # Invariants
//! - Background loads touch order only through `SlotOrder::merge`.

pub mod note_order;
pub mod slot_order;
pub mod time_key;
