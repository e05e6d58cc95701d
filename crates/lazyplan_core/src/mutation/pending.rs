//! In-flight mutation records and per-entity request generations.
//!
//! # Responsibility
//! - Describe one optimistic mutation awaiting remote settlement.
//! - Track request generations so superseded responses can be recognized.
//!
//! # Invariants
//! - Generations are strictly increasing across the whole tracker.
//! - An entity is "in flight" while at least one issued request for it has
//!   not been settled.

use crate::model::ids::LocalId;
use crate::model::note::Note;
use crate::model::schedule::{ScheduledItem, Slot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Note,
    ScheduledItem,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note => f.write_str("note"),
            Self::ScheduledItem => f.write_str("scheduled_item"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
    Create,
    Update,
    Delete,
    TogglePin,
    ToggleComplete,
    MoveSlot,
}

impl Display for MutationOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::TogglePin => "toggle_pin",
            Self::ToggleComplete => "toggle_complete",
            Self::MoveSlot => "move_slot",
        };
        f.write_str(name)
    }
}

/// What rollback needs to restore the pre-mutation state.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackSnapshot {
    /// The entity did not exist before; rollback removes it.
    Created,
    /// Pre-mutation note; rollback re-inserts it through the note ordering.
    Note(Note),
    /// Pre-mutation item and where it sat.
    Item {
        item: ScheduledItem,
        position: Option<(Slot, usize)>,
    },
}

/// An optimistic mutation applied locally and awaiting its remote response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub kind: EntityKind,
    pub entity: LocalId,
    pub op: MutationOp,
    pub generation: u64,
    pub snapshot: RollbackSnapshot,
}

/// How responses for superseded requests are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// A response older than the newest request for the same entity is
    /// discarded instead of rolling back newer optimistic state.
    #[default]
    LatestWins,
    /// Every response applies in arrival order.
    ArrivalOrder,
}

#[derive(Debug, Clone)]
struct EntityFlight {
    latest: u64,
    latest_op: MutationOp,
    /// `None` while the newest request is unsettled.
    latest_succeeded: Option<bool>,
    outstanding: usize,
    /// State before the oldest request of this flight.
    base: RollbackSnapshot,
    acked: bool,
}

/// What settling one request revealed about its entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledRequest {
    /// The request was the newest issued for the entity.
    pub latest: bool,
    /// A newer request is still unsettled or has already succeeded.
    pub superseded: bool,
    /// State before the whole flight, set when this settlement ended a
    /// flight in which no request succeeded.
    pub base: Option<RollbackSnapshot>,
}

impl SettledRequest {
    fn untracked() -> Self {
        Self {
            latest: true,
            superseded: false,
            base: None,
        }
    }
}

/// Issues and settles request generations per entity.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    last_issued: u64,
    flights: HashMap<(EntityKind, LocalId), EntityFlight>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next generation for one entity. `snapshot` becomes the
    /// flight's base when no other request for the entity is unsettled.
    pub fn issue(
        &mut self,
        kind: EntityKind,
        entity: LocalId,
        op: MutationOp,
        snapshot: &RollbackSnapshot,
    ) -> u64 {
        self.last_issued += 1;
        let generation = self.last_issued;
        let flight = self
            .flights
            .entry((kind, entity))
            .or_insert_with(|| EntityFlight {
                latest: generation,
                latest_op: op,
                latest_succeeded: None,
                outstanding: 0,
                base: snapshot.clone(),
                acked: false,
            });
        flight.latest = generation;
        flight.latest_op = op;
        flight.latest_succeeded = None;
        flight.outstanding += 1;
        generation
    }

    /// Whether `generation` is the newest request issued for the entity.
    pub fn is_latest(&self, kind: EntityKind, entity: LocalId, generation: u64) -> bool {
        self.flights
            .get(&(kind, entity))
            .map_or(true, |flight| flight.latest == generation)
    }

    /// Marks one request as settled with its remote outcome.
    pub fn settle(
        &mut self,
        kind: EntityKind,
        entity: LocalId,
        generation: u64,
        succeeded: bool,
    ) -> SettledRequest {
        let key = (kind, entity);
        let Some(flight) = self.flights.get_mut(&key) else {
            return SettledRequest::untracked();
        };
        let latest = flight.latest == generation;
        let superseded = !latest && flight.latest_succeeded != Some(false);
        if latest {
            flight.latest_succeeded = Some(succeeded);
        }
        flight.acked |= succeeded;
        flight.outstanding = flight.outstanding.saturating_sub(1);
        if flight.outstanding > 0 {
            return SettledRequest {
                latest,
                superseded,
                base: None,
            };
        }
        let base = self
            .flights
            .remove(&key)
            .filter(|flight| !flight.acked)
            .map(|flight| flight.base);
        SettledRequest {
            latest,
            superseded,
            base,
        }
    }

    /// Moves an entity's flight record to a new id after confirmation.
    pub fn rekey(&mut self, kind: EntityKind, old: LocalId, new: LocalId) {
        if let Some(flight) = self.flights.remove(&(kind, old)) {
            self.flights.insert((kind, new), flight);
        }
    }

    /// Entities of `kind` with unsettled requests, mapped to their newest op.
    pub fn in_flight(&self, kind: EntityKind) -> HashMap<LocalId, MutationOp> {
        self.flights
            .iter()
            .filter(|((flight_kind, _), _)| *flight_kind == kind)
            .map(|((_, entity), flight)| (*entity, flight.latest_op))
            .collect()
    }

    pub fn outstanding(&self) -> usize {
        self.flights.values().map(|flight| flight.outstanding).sum()
    }
}
