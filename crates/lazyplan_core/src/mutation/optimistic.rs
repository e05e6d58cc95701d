//! Optimistic apply / confirm / rollback driver.
//!
//! # Responsibility
//! - Run the shared lifecycle of every mutation: validate, apply locally,
//!   issue a request generation, then settle with the remote outcome.
//! - Restore pre-mutation state from a `RollbackSnapshot` on failure.
//!
//! # Invariants
//! - When every request of an entity's flight failed, the entity ends at the
//!   state it had before the flight's first request.
//! - `begin` either fully applies a mutation or leaves state untouched.
//! - Every issued generation is settled exactly once by `confirm` or `reject`.
//! - A create confirmation re-keys the temp id in place; the item keeps the
//!   slot and index the user sees.

use super::pending::{
    EntityKind, GenerationTracker, MutationOp, PendingMutation, RollbackSnapshot, StalePolicy,
};
use super::{Confirmation, DiscardReason, MutationError, Settlement, ValidationError};
use crate::model::ids::LocalId;
use crate::remote::{RemoteEntry, RemoteError, RemoteNote, RemoteResult};
use crate::state::TodayState;
use crate::sync::reconcile::{entry_to_item, note_from_remote};
use chrono::{DateTime, FixedOffset};
use log::{debug, info, warn};
use std::collections::HashMap;

/// One optimistic change to local state.
pub trait Mutation {
    fn kind(&self) -> EntityKind;

    fn op(&self) -> MutationOp;

    /// Checks the mutation against current state without touching it.
    fn validate(&self, state: &TodayState) -> Result<(), ValidationError>;

    /// Applies the change and returns the affected entity and what rollback
    /// needs. Only called after `validate` succeeded.
    fn apply_local(
        &self,
        state: &mut TodayState,
        now: DateTime<FixedOffset>,
    ) -> Result<(LocalId, RollbackSnapshot), ValidationError>;
}

/// Applies mutations and settles their remote outcomes.
#[derive(Debug, Default)]
pub struct OptimisticMutator {
    generations: GenerationTracker,
    policy: StalePolicy,
}

impl OptimisticMutator {
    pub fn new(policy: StalePolicy) -> Self {
        Self {
            generations: GenerationTracker::new(),
            policy,
        }
    }

    pub fn policy(&self) -> StalePolicy {
        self.policy
    }

    /// Validates and applies `mutation`, returning the record to settle later.
    pub fn begin<M: Mutation + ?Sized>(
        &mut self,
        state: &mut TodayState,
        mutation: &M,
        now: DateTime<FixedOffset>,
    ) -> Result<PendingMutation, ValidationError> {
        let kind = mutation.kind();
        let op = mutation.op();
        if let Err(err) = mutation.validate(state) {
            warn!(
                "event=mutation_validate module=mutator status=error kind={} op={} error={}",
                kind, op, err
            );
            return Err(err);
        }
        let (entity, snapshot) = mutation.apply_local(state, now)?;
        let generation = self.generations.issue(kind, entity, op, &snapshot);
        debug!(
            "event=mutation_apply module=mutator status=ok kind={} op={} entity={} generation={}",
            kind, op, entity, generation
        );
        Ok(PendingMutation {
            kind,
            entity,
            op,
            generation,
            snapshot,
        })
    }

    /// Settles a successful remote call.
    pub fn confirm(
        &mut self,
        state: &mut TodayState,
        pending: PendingMutation,
        confirmation: Confirmation,
    ) -> Settlement {
        let settled = self
            .generations
            .settle(pending.kind, pending.entity, pending.generation, true);
        let settlement = match confirmation {
            Confirmation::Note(remote) if pending.op == MutationOp::Create => {
                self.resolve_note(state, pending.entity, &remote)
            }
            Confirmation::Entry(remote) if pending.op == MutationOp::Create => {
                self.resolve_entry(state, pending.entity, &remote)
            }
            _ if !settled.latest && self.policy == StalePolicy::LatestWins => {
                Settlement::Discarded(DiscardReason::Superseded)
            }
            _ => Settlement::Applied(pending.entity),
        };
        debug!(
            "event=mutation_confirm module=mutator status=ok kind={} op={} entity={} generation={} settlement={:?}",
            pending.kind, pending.op, pending.entity, pending.generation, settlement
        );
        settlement
    }

    /// Settles a failed remote call, rolling back unless superseded.
    ///
    /// A failure that ends a flight with no successful request restores the
    /// state from before the flight instead of the request's own snapshot.
    pub fn reject(
        &mut self,
        state: &mut TodayState,
        mut pending: PendingMutation,
        error: &RemoteError,
    ) -> Settlement {
        let settled = self
            .generations
            .settle(pending.kind, pending.entity, pending.generation, false);
        if settled.superseded
            && self.policy == StalePolicy::LatestWins
            && pending.op != MutationOp::Create
        {
            info!(
                "event=mutation_reject module=mutator status=discarded kind={} op={} entity={} generation={} remote_op={}",
                pending.kind, pending.op, pending.entity, pending.generation, error.op()
            );
            return Settlement::Discarded(DiscardReason::Superseded);
        }

        if let Some(base) = settled.base {
            pending.snapshot = base;
        }
        let kind = pending.kind;
        let op = pending.op;
        let entity = pending.entity;
        let settlement = if rollback(state, pending) {
            Settlement::RolledBack
        } else {
            Settlement::Discarded(DiscardReason::StaleId)
        };
        warn!(
            "event=mutation_reject module=mutator status=error kind={} op={} entity={} remote_op={} settlement={:?}",
            kind, op, entity, error.op(), settlement
        );
        settlement
    }

    /// Settles with a raw remote outcome. A failure is returned after the
    /// rollback (or discard) has been applied.
    pub fn settle(
        &mut self,
        state: &mut TodayState,
        pending: PendingMutation,
        outcome: RemoteResult<Confirmation>,
    ) -> Result<Settlement, MutationError> {
        match outcome {
            Ok(confirmation) => Ok(self.confirm(state, pending, confirmation)),
            Err(err) => {
                self.reject(state, pending, &err);
                Err(MutationError::Remote(err))
            }
        }
    }

    /// Settles a request whose target state is gone (e.g. the day changed)
    /// without touching state.
    pub fn abandon(&mut self, pending: PendingMutation) -> Settlement {
        self.generations
            .settle(pending.kind, pending.entity, pending.generation, false);
        info!(
            "event=mutation_abandon module=mutator status=discarded kind={} op={} entity={} generation={}",
            pending.kind, pending.op, pending.entity, pending.generation
        );
        Settlement::Discarded(DiscardReason::StaleId)
    }

    /// Entities of `kind` with unsettled requests, mapped to their newest op.
    pub fn in_flight(&self, kind: EntityKind) -> HashMap<LocalId, MutationOp> {
        self.generations.in_flight(kind)
    }

    pub fn outstanding(&self) -> usize {
        self.generations.outstanding()
    }

    fn resolve_note(
        &mut self,
        state: &mut TodayState,
        temp: LocalId,
        remote: &RemoteNote,
    ) -> Settlement {
        let confirmed = note_from_remote(remote);
        let new_id = confirmed.id;
        if !state.notes.contains(temp) {
            return Settlement::Discarded(DiscardReason::StaleId);
        }
        if state.notes.contains(new_id) {
            state.notes.remove(temp);
        } else {
            state.notes.replace_id(temp, confirmed);
        }
        self.generations.rekey(EntityKind::Note, temp, new_id);
        Settlement::Applied(new_id)
    }

    fn resolve_entry(
        &mut self,
        state: &mut TodayState,
        temp: LocalId,
        remote: &RemoteEntry,
    ) -> Settlement {
        let Some(local) = state.items.get(&temp) else {
            return Settlement::Discarded(DiscardReason::StaleId);
        };
        let mut confirmed = entry_to_item(remote, &state.catalog);
        confirmed.reward = local.reward;
        let new_id = confirmed.id;
        // A refresh may already have appended the server copy.
        if state.remove_item(new_id).is_some() {
            debug!(
                "event=mutation_confirm module=mutator status=merged kind=scheduled_item temp={} entity={}",
                temp, new_id
            );
        }
        state.replace_item_id(temp, confirmed);
        self.generations.rekey(EntityKind::ScheduledItem, temp, new_id);
        Settlement::Applied(new_id)
    }
}

/// Restores the state captured in `pending.snapshot`.
///
/// Returns `false` when there was nothing left to undo.
pub fn rollback(state: &mut TodayState, pending: PendingMutation) -> bool {
    match pending.snapshot {
        RollbackSnapshot::Created => match pending.kind {
            EntityKind::Note => state.notes.remove(pending.entity).is_some(),
            EntityKind::ScheduledItem => state.remove_item(pending.entity).is_some(),
        },
        RollbackSnapshot::Note(note) => {
            state.notes.upsert(note);
            true
        }
        RollbackSnapshot::Item { item, position } => {
            state.remove_item(item.id);
            let index = position.map_or(usize::MAX, |(_, index)| index);
            state.insert_item(item, index);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{rollback, OptimisticMutator};
    use crate::model::ids::LocalId;
    use crate::model::note::Note;
    use crate::model::schedule::{ScheduledItem, Slot, SourceRef};
    use crate::mutation::item_ops::{CreateItem, MoveItem};
    use crate::mutation::note_ops::{CreateNote, EditNote};
    use crate::mutation::pending::{EntityKind, StalePolicy};
    use crate::mutation::{Confirmation, DiscardReason, Settlement, ValidationError};
    use crate::ordering::time_key::TimeComparator;
    use crate::remote::{EntryStatus, RemoteEntry, RemoteError, RemoteNote, RemoteOp};
    use crate::state::TodayState;
    use crate::sync::reconcile::reconcile_entries;
    use chrono::{DateTime, FixedOffset, NaiveDate};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap()
    }

    fn rejected(op: RemoteOp) -> RemoteError {
        RemoteError::Rejected { op }
    }

    fn custom_entry(id: i64, name: &str) -> RemoteEntry {
        RemoteEntry {
            id,
            slot: Slot::Morning,
            date: day(),
            status: EntryStatus::Ongoing,
            source_kind: "custom".to_string(),
            task_id: None,
            habit_id: None,
            display_name: Some(name.to_string()),
        }
    }

    fn state_with_note(content: &str) -> TodayState {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        state
            .notes
            .upsert(Note::new(LocalId::Server(1), content, "2024-05-01 08:00:00"));
        state
    }

    #[test]
    fn blank_content_is_rejected_before_any_change() {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        let mut mutator = OptimisticMutator::default();
        let err = mutator
            .begin(&mut state, &CreateNote::new("   "), now())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyContent);
        assert!(state.notes().is_empty());
        assert_eq!(mutator.outstanding(), 0);
    }

    #[test]
    fn failed_create_removes_temp_note() {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        let mut mutator = OptimisticMutator::default();
        let pending = mutator
            .begin(&mut state, &CreateNote::new("hello"), now())
            .unwrap();
        assert_eq!(state.notes().len(), 1);

        let settlement = mutator.reject(&mut state, pending, &rejected(RemoteOp::CreateNote));
        assert_eq!(settlement, Settlement::RolledBack);
        assert!(state.notes().is_empty());
        assert_eq!(mutator.outstanding(), 0);
    }

    #[test]
    fn confirmed_create_takes_server_id() {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        let mut mutator = OptimisticMutator::default();
        let create = CreateNote::new("hello");
        let pending = mutator.begin(&mut state, &create, now()).unwrap();

        let remote = RemoteNote {
            id: 41,
            content: "hello".to_string(),
            created_at: "2024-05-01 12:00:00.000001+00".to_string(),
            updated_at: "2024-05-01 12:00:00.000001+00".to_string(),
            pinned: false,
        };
        let settlement = mutator.confirm(&mut state, pending, Confirmation::Note(remote));
        assert_eq!(settlement, Settlement::Applied(LocalId::Server(41)));
        assert!(state.notes().contains(LocalId::Server(41)));
        assert!(!state.notes().contains(create.id));
    }

    #[test]
    fn create_confirmation_after_local_removal_is_stale() {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        let mut mutator = OptimisticMutator::default();
        let create = CreateNote::new("hello");
        let pending = mutator.begin(&mut state, &create, now()).unwrap();
        state.notes.remove(create.id);

        let remote = RemoteNote {
            id: 41,
            content: "hello".to_string(),
            created_at: "2024-05-01 12:00:00+00".to_string(),
            updated_at: "2024-05-01 12:00:00+00".to_string(),
            pinned: false,
        };
        assert_eq!(
            mutator.confirm(&mut state, pending, Confirmation::Note(remote)),
            Settlement::Discarded(DiscardReason::StaleId)
        );
        assert!(state.notes().is_empty());
    }

    #[test]
    fn entry_confirmation_keeps_local_position() {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        state.insert_item(
            ScheduledItem::new(LocalId::Server(1), "First", Slot::Morning, SourceRef::Custom),
            0,
        );
        let mut mutator = OptimisticMutator::default();
        let create = CreateItem::custom("Second", Slot::Morning).at(0);
        let pending = mutator.begin(&mut state, &create, now()).unwrap();

        mutator.confirm(&mut state, pending, Confirmation::Entry(custom_entry(9, "Second")));
        assert_eq!(
            state.order().get(Slot::Morning),
            &[LocalId::Server(9), LocalId::Server(1)]
        );
        assert!(state.is_consistent());
    }

    #[test]
    fn entry_confirmation_takes_over_copy_loaded_by_refresh() {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        state.insert_item(
            ScheduledItem::new(LocalId::Server(1), "Run", Slot::Morning, SourceRef::Custom),
            0,
        );
        let mut mutator = OptimisticMutator::default();
        let create = CreateItem::custom("Swim", Slot::Morning).at(0).with_reward(Some(7.0));
        let pending = mutator.begin(&mut state, &create, now()).unwrap();

        let in_flight = mutator.in_flight(EntityKind::ScheduledItem);
        let fresh = [custom_entry(1, "Run"), custom_entry(9, "Swim")];
        reconcile_entries(&mut state, &fresh, &in_flight);
        assert!(state.items.contains_key(&LocalId::Server(9)));

        let settlement =
            mutator.confirm(&mut state, pending, Confirmation::Entry(custom_entry(9, "Swim")));
        assert_eq!(settlement, Settlement::Applied(LocalId::Server(9)));
        assert_eq!(
            state.order().get(Slot::Morning),
            &[LocalId::Server(9), LocalId::Server(1)]
        );
        assert_eq!(state.item(LocalId::Server(9)).unwrap().reward, Some(7.0));
        assert!(state.is_consistent());
    }

    #[test]
    fn failing_every_overlapping_edit_restores_pre_flight_content() {
        let mut state = state_with_note("v0");
        let mut mutator = OptimisticMutator::new(StalePolicy::LatestWins);
        let first = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v1"), now())
            .unwrap();
        let second = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v2"), now())
            .unwrap();

        assert_eq!(
            mutator.reject(&mut state, first, &rejected(RemoteOp::UpdateNote)),
            Settlement::Discarded(DiscardReason::Superseded)
        );
        assert_eq!(
            mutator.reject(&mut state, second, &rejected(RemoteOp::UpdateNote)),
            Settlement::RolledBack
        );
        assert_eq!(state.notes().get(LocalId::Server(1)).unwrap().content, "v0");
        assert_eq!(mutator.outstanding(), 0);
    }

    #[test]
    fn newer_failure_then_older_failure_ends_at_pre_flight_content() {
        let mut state = state_with_note("v0");
        let mut mutator = OptimisticMutator::new(StalePolicy::LatestWins);
        let first = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v1"), now())
            .unwrap();
        let second = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v2"), now())
            .unwrap();

        mutator.reject(&mut state, second, &rejected(RemoteOp::UpdateNote));
        assert_eq!(state.notes().get(LocalId::Server(1)).unwrap().content, "v1");
        assert_eq!(
            mutator.reject(&mut state, first, &rejected(RemoteOp::UpdateNote)),
            Settlement::RolledBack
        );
        assert_eq!(state.notes().get(LocalId::Server(1)).unwrap().content, "v0");
    }

    #[test]
    fn superseded_failure_does_not_clobber_newer_edit() {
        let mut state = state_with_note("v0");
        let mut mutator = OptimisticMutator::new(StalePolicy::LatestWins);
        let first = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v1"), now())
            .unwrap();
        let second = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v2"), now())
            .unwrap();

        assert_eq!(
            mutator.reject(&mut state, first, &rejected(RemoteOp::UpdateNote)),
            Settlement::Discarded(DiscardReason::Superseded)
        );
        assert_eq!(state.notes().get(LocalId::Server(1)).unwrap().content, "v2");
        assert_eq!(
            mutator.confirm(&mut state, second, Confirmation::Ack),
            Settlement::Applied(LocalId::Server(1))
        );
        assert!(mutator.in_flight(EntityKind::Note).is_empty());
    }

    #[test]
    fn arrival_order_applies_every_failure() {
        let mut state = state_with_note("v0");
        let mut mutator = OptimisticMutator::new(StalePolicy::ArrivalOrder);
        let first = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v1"), now())
            .unwrap();
        let _second = mutator
            .begin(&mut state, &EditNote::new(LocalId::Server(1), "v2"), now())
            .unwrap();

        assert_eq!(
            mutator.reject(&mut state, first, &rejected(RemoteOp::UpdateNote)),
            Settlement::RolledBack
        );
        assert_eq!(state.notes().get(LocalId::Server(1)).unwrap().content, "v0");
    }

    #[test]
    fn move_rollback_restores_slot_and_index() {
        let mut state = TodayState::new(day(), TimeComparator::utc());
        for (id, title) in [(1, "A"), (2, "B")] {
            state.insert_item(
                ScheduledItem::new(LocalId::Server(id), title, Slot::Morning, SourceRef::Custom),
                usize::MAX,
            );
        }
        let mut mutator = OptimisticMutator::default();
        let pending = mutator
            .begin(
                &mut state,
                &MoveItem::new(LocalId::Server(1), Slot::Afternoon, 0),
                now(),
            )
            .unwrap();
        assert_eq!(state.titles_in(Slot::Afternoon), vec!["A"]);

        assert!(rollback(&mut state, pending));
        assert_eq!(state.titles_in(Slot::Morning), vec!["A", "B"]);
        assert!(state.titles_in(Slot::Afternoon).is_empty());
        assert!(state.is_consistent());
    }
}
