//! Domain model for the Today view.
//!
//! # Responsibility
//! - Define scheduled items, notes, catalog entries and their identities.
//!
//! # Invariants
//! - Every entity is addressed by a [`ids::LocalId`], temporary or confirmed.

pub mod catalog;
pub mod ids;
pub mod note;
pub mod schedule;
