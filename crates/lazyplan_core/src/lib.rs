//! Core engine for the LazyPlan Today board.
//! Holds the ordering, reconciliation, optimistic-mutation and drag rules;
//! UI layers only render `TodayState` and forward user events.

pub mod config;
pub mod drag;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod ordering;
pub mod remote;
pub mod reward;
pub mod service;
pub mod state;
pub mod sync;

pub use config::{ConfigError, EngineConfig};
pub use drag::{
    classify, Container, DragAbort, DragEnd, DragKey, DragKeyError, DragPhase, DragPlan,
    DragReorderEngine, DropLocation,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use model::catalog::{Catalog, CatalogEntry, CatalogKind};
pub use model::ids::{LocalId, LocalIdParseError, ServerId};
pub use model::note::Note;
pub use model::schedule::{ScheduledItem, Slot, SourceRef, UnknownSlot};
pub use mutation::{
    Confirmation, DiscardReason, MutationError, MutationOp, OptimisticMutator, Settlement,
    StalePolicy, ValidationError,
};
pub use ordering::note_order::{is_render_ordered, sort_notes, NoteList};
pub use ordering::slot_order::{merge_order, OrderError, SlotOrder};
pub use ordering::time_key::{compare_recency, TimeComparator, TimeValue};
pub use remote::memory::{InMemoryStore, RemoteCall};
pub use remote::{
    EntryPatch, EntryStatus, NewScheduleEntry, RemoteEntry, RemoteError, RemoteNote, RemoteOp,
    RemoteResult, RemoteStore,
};
pub use reward::{RewardPolicy, SuccessiveDivision};
pub use service::{DropOutcome, RefreshReport, TodayService, TodayServiceError};
pub use state::TodayState;
pub use sync::ReconcileReport;

/// Minimal health-check API for wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
