//! Drag-and-drop classification for the Today board.
//!
//! # Responsibility
//! - Identify draggable elements with a typed key.
//! - Classify a finished drag into a plan the service executes.
//!
//! # Invariants
//! - Classification never mutates state; an aborted drag leaves everything as
//!   it was and issues no remote call.

pub mod engine;
pub mod key;

pub use engine::{
    classify, Container, DragAbort, DragEnd, DragPhase, DragPlan, DragReorderEngine, DropLocation,
};
pub use key::{DragKey, DragKeyError};
