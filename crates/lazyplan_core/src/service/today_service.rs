//! Today board service.
//!
//! # Responsibility
//! - Load the day's schedule, notes and catalogs and reconcile them into
//!   local state.
//! - Run every user edit through the optimistic mutator against the remote
//!   store.
//! - Execute drag-and-drop plans.
//!
//! # Invariants
//! - Local state is never borrowed across an `.await`; each handler applies
//!   its optimistic change before the remote call is first polled.
//! - `refresh` is all-or-nothing: any failed load leaves state untouched.
//! - Item mutations that settle after the day changed are abandoned instead of
//!   touching the new day's schedule.

use crate::config::{ConfigError, EngineConfig};
use crate::drag::{DragAbort, DragEnd, DragKey, DragPlan, DragReorderEngine};
use crate::model::catalog::CatalogKind;
use crate::model::ids::{LocalId, ServerId};
use crate::model::schedule::Slot;
use crate::mutation::item_ops::{
    CreateItem, DeleteItem, EditItemTitle, MoveItem, SetItemCompleted,
};
use crate::mutation::note_ops::{CreateNote, DeleteNote, EditNote, SetNotePin};
use crate::mutation::pending::EntityKind;
use crate::mutation::{
    Confirmation, Mutation, MutationError, OptimisticMutator, Settlement, ValidationError,
};
use crate::ordering::slot_order::OrderError;
use crate::remote::{
    EntryPatch, EntryStatus, NewScheduleEntry, RemoteError, RemoteResult, RemoteStore,
};
use crate::reward::{reward_for, RewardPolicy};
use crate::state::TodayState;
use crate::sync::{reconcile_entries, reconcile_notes, ReconcileReport};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use log::{info, warn};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

type Clock = Box<dyn Fn() -> DateTime<FixedOffset>>;
type LocalOnly = std::future::Ready<RemoteResult<Confirmation>>;

/// Service error for Today board use-cases.
#[derive(Debug, Clone, PartialEq)]
pub enum TodayServiceError {
    Validation(ValidationError),
    /// Remote call failed; the optimistic change was rolled back unless a
    /// newer request superseded it.
    Remote(RemoteError),
    Drag(DragAbort),
    Order(OrderError),
    Config(ConfigError),
}

impl Display for TodayServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::Drag(err) => write!(f, "drag aborted: {err}"),
            Self::Order(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodayServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Drag(err) => Some(err),
            Self::Order(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<ValidationError> for TodayServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RemoteError> for TodayServiceError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<MutationError> for TodayServiceError {
    fn from(value: MutationError) -> Self {
        match value {
            MutationError::Validation(err) => Self::Validation(err),
            MutationError::Remote(err) => Self::Remote(err),
        }
    }
}

impl From<DragAbort> for TodayServiceError {
    fn from(value: DragAbort) -> Self {
        Self::Drag(value)
    }
}

impl From<OrderError> for TodayServiceError {
    fn from(value: OrderError) -> Self {
        Self::Order(value)
    }
}

impl From<ConfigError> for TodayServiceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Result of one `refresh`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub entries: ReconcileReport,
    pub notes: ReconcileReport,
    /// `false` when the day changed while loading and the data was dropped.
    pub applied: bool,
}

/// What a drop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Noop,
    Reordered,
    Moved(LocalId),
    Promoted(LocalId),
}

/// Today board facade over a remote store.
pub struct TodayService<R: RemoteStore> {
    remote: R,
    state: RefCell<TodayState>,
    mutator: RefCell<OptimisticMutator>,
    drag: RefCell<DragReorderEngine>,
    config: EngineConfig,
    reward: Box<dyn RewardPolicy>,
    clock: Clock,
}

impl<R: RemoteStore> TodayService<R> {
    /// Creates a service showing `date`. State stays empty until `refresh`.
    pub fn new(
        remote: R,
        date: NaiveDate,
        config: EngineConfig,
    ) -> Result<Self, TodayServiceError> {
        config.validate()?;
        let comparator = config.comparator();
        let offset = comparator.offset();
        Ok(Self {
            remote,
            state: RefCell::new(TodayState::new(date, comparator)),
            mutator: RefCell::new(OptimisticMutator::new(config.stale_policy)),
            drag: RefCell::new(DragReorderEngine::new()),
            reward: Box::new(config.reward_policy()),
            clock: Box::new(move || Utc::now().with_timezone(&offset)),
            config,
        })
    }

    /// Replaces the clock used for `updated_at` stamps.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<FixedOffset> + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_reward_policy<P>(mut self, policy: P) -> Self
    where
        P: RewardPolicy + 'static,
    {
        self.reward = Box::new(policy);
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn date(&self) -> NaiveDate {
        self.state.borrow().date()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> TodayState {
        self.state.borrow().clone()
    }

    /// Reads state without cloning it.
    pub fn with_state<T>(&self, read: impl FnOnce(&TodayState) -> T) -> T {
        read(&self.state.borrow())
    }

    /// Number of remote requests not settled yet.
    pub fn pending_count(&self) -> usize {
        self.mutator.borrow().outstanding()
    }

    /// Loads the day's entries, the notes and both catalogs concurrently,
    /// then reconciles them into local state.
    pub async fn refresh(&self) -> Result<RefreshReport, TodayServiceError> {
        let date = self.date();
        info!("event=refresh module=today_service status=start date={}", date);

        let (entries, notes, tasks, habits) = futures::join!(
            self.remote.load_schedule_entries_range(date, date),
            self.remote.load_notes(),
            self.remote.load_catalog(CatalogKind::Task),
            self.remote.load_catalog(CatalogKind::Habit),
        );
        let loaded = entries.and_then(|entries| Ok((entries, notes?, tasks?, habits?)));
        let (entries, notes, tasks, habits) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(
                    "event=refresh module=today_service status=error date={} remote_op={}",
                    date,
                    err.op()
                );
                return Err(err.into());
            }
        };

        let mut state = self.state.borrow_mut();
        if state.date() != date {
            info!(
                "event=refresh module=today_service status=discarded loaded_date={} current_date={}",
                date,
                state.date()
            );
            return Ok(RefreshReport::default());
        }

        let mutator = self.mutator.borrow();
        state.catalog_mut().set(CatalogKind::Task, tasks);
        state.catalog_mut().set(CatalogKind::Habit, habits);
        let day_entries: Vec<_> = entries.into_values().flatten().collect();
        let report = RefreshReport {
            entries: reconcile_entries(
                &mut state,
                &day_entries,
                &mutator.in_flight(EntityKind::ScheduledItem),
            ),
            notes: reconcile_notes(&mut state, &notes, &mutator.in_flight(EntityKind::Note)),
            applied: true,
        };
        info!(
            "event=refresh module=today_service status=ok date={} items={} notes={}",
            date,
            state.item_count(),
            state.notes().len()
        );
        Ok(report)
    }

    /// Switches to another day. The schedule is cleared until the next
    /// `refresh`; notes and catalogs stay.
    pub fn set_date(&self, date: NaiveDate) {
        self.drag.borrow_mut().cancel();
        self.state.borrow_mut().reset_day(date);
        info!("event=set_date module=today_service status=ok date={}", date);
    }

    pub async fn create_note(
        &self,
        content: impl Into<String>,
    ) -> Result<LocalId, TodayServiceError> {
        let mutation = CreateNote::new(content);
        let call = self
            .remote
            .create_note(mutation.content.clone(), self.config.suppress_refresh);
        self.run(&mutation, Some(async move { call.await.map(Confirmation::Note) }))
            .await
    }

    pub async fn edit_note(
        &self,
        id: LocalId,
        content: impl Into<String>,
    ) -> Result<(), TodayServiceError> {
        let mutation = EditNote::new(id, content);
        let server_id = confirmed(EntityKind::Note, id)?;
        let call = self.remote.update_note(
            server_id,
            mutation.content.clone(),
            self.config.suppress_refresh,
        );
        self.run(&mutation, Some(acknowledged(call))).await?;
        Ok(())
    }

    pub async fn set_note_pinned(
        &self,
        id: LocalId,
        pinned: bool,
    ) -> Result<(), TodayServiceError> {
        let mutation = SetNotePin::new(id, pinned);
        let server_id = confirmed(EntityKind::Note, id)?;
        let call = self
            .remote
            .toggle_note_pin(server_id, pinned, self.config.suppress_refresh);
        self.run(&mutation, Some(acknowledged(call))).await?;
        Ok(())
    }

    /// Deletes a note. A temp note is dropped locally without a remote call.
    pub async fn delete_note(&self, id: LocalId) -> Result<(), TodayServiceError> {
        let mutation = DeleteNote::new(id);
        match id.server_id() {
            Some(server_id) => {
                let call = self
                    .remote
                    .delete_note(server_id, self.config.suppress_refresh);
                self.run(&mutation, Some(acknowledged(call))).await?;
            }
            None => {
                self.run(&mutation, None::<LocalOnly>).await?;
            }
        }
        Ok(())
    }

    /// Adds a custom item to `slot`, appended when `index` is `None`.
    pub async fn create_item(
        &self,
        title: impl Into<String>,
        slot: Slot,
        index: Option<usize>,
    ) -> Result<LocalId, TodayServiceError> {
        let mut mutation = CreateItem::custom(title, slot);
        mutation.index = index;
        self.create_item_with(mutation).await
    }

    /// Adds an instance of a catalog entry, carrying its reward.
    pub async fn schedule_catalog_entry(
        &self,
        kind: CatalogKind,
        entry_id: ServerId,
        slot: Slot,
        index: Option<usize>,
    ) -> Result<LocalId, TodayServiceError> {
        let mutation = {
            let state = self.state.borrow();
            let entry = state.catalog().find(kind, entry_id).ok_or(
                ValidationError::UnknownEntity {
                    kind: EntityKind::ScheduledItem,
                    id: LocalId::Server(entry_id),
                },
            )?;
            let mut mutation = CreateItem::from_catalog(entry, slot).with_reward(reward_for(
                self.reward.as_ref(),
                entry,
                self.config.daily_rate,
            ));
            mutation.index = index;
            mutation
        };
        self.create_item_with(mutation).await
    }

    async fn create_item_with(&self, mutation: CreateItem) -> Result<LocalId, TodayServiceError> {
        let data = NewScheduleEntry {
            date: self.date(),
            slot: mutation.slot,
            source: mutation.source,
            display_name: mutation.display_name(),
        };
        let call = self.remote.create_schedule_entry(data);
        self.run(&mutation, Some(async move { call.await.map(Confirmation::Entry) }))
            .await
    }

    pub async fn edit_item_title(
        &self,
        id: LocalId,
        title: impl Into<String>,
    ) -> Result<(), TodayServiceError> {
        let mutation = EditItemTitle::new(id, title);
        let server_id = confirmed(EntityKind::ScheduledItem, id)?;
        let call = self.remote.update_schedule_entry(
            server_id,
            EntryPatch::display_name(mutation.title.clone()),
        );
        self.run(&mutation, Some(acknowledged(call))).await?;
        Ok(())
    }

    pub async fn set_item_completed(
        &self,
        id: LocalId,
        completed: bool,
    ) -> Result<(), TodayServiceError> {
        let mutation = SetItemCompleted::new(id, completed);
        let server_id = confirmed(EntityKind::ScheduledItem, id)?;
        let call = self.remote.update_schedule_entry(
            server_id,
            EntryPatch::status(EntryStatus::from_completed(completed)),
        );
        self.run(&mutation, Some(acknowledged(call))).await?;
        Ok(())
    }

    /// Moves an item to `to_slot` at `to_index`. Moves within the current
    /// slot only reorder locally; order inside a slot is not persisted.
    pub async fn move_item(
        &self,
        id: LocalId,
        to_slot: Slot,
        to_index: usize,
    ) -> Result<(), TodayServiceError> {
        let current = self.with_state(|state| state.order().position(id));
        if let Some((slot, from)) = current {
            if slot == to_slot {
                let last = self.with_state(|state| state.order().len(slot)).saturating_sub(1);
                return self.reorder(slot, from, to_index.min(last));
            }
        }
        let mutation = MoveItem::new(id, to_slot, to_index);
        let server_id = confirmed(EntityKind::ScheduledItem, id)?;
        let call = self
            .remote
            .update_schedule_entry(server_id, EntryPatch::slot(to_slot));
        self.run(&mutation, Some(acknowledged(call))).await?;
        Ok(())
    }

    /// Local-only reorder inside one slot.
    pub fn reorder(&self, slot: Slot, from: usize, to: usize) -> Result<(), TodayServiceError> {
        self.state.borrow_mut().order.reorder(slot, from, to)?;
        Ok(())
    }

    /// Deletes an item. A temp item is dropped locally without a remote call.
    pub async fn delete_item(&self, id: LocalId) -> Result<(), TodayServiceError> {
        let mutation = DeleteItem::new(id);
        match id.server_id() {
            Some(server_id) => {
                let call = self.remote.delete_schedule_entry(server_id);
                self.run(&mutation, Some(acknowledged(call))).await?;
            }
            None => {
                self.run(&mutation, None::<LocalOnly>).await?;
            }
        }
        Ok(())
    }

    pub fn start_drag(&self, key: DragKey) {
        self.drag.borrow_mut().start(key);
    }

    pub fn cancel_drag(&self) {
        self.drag.borrow_mut().cancel();
    }

    /// Classifies and executes a drop. Aborted drops change nothing.
    pub async fn handle_drop(&self, end: DragEnd) -> Result<DropOutcome, TodayServiceError> {
        let plan = {
            let state = self.state.borrow();
            self.drag.borrow_mut().finish(&state, &end)?
        };
        match plan {
            DragPlan::Noop => Ok(DropOutcome::Noop),
            DragPlan::Reorder { slot, from, to } => {
                self.reorder(slot, from, to)?;
                Ok(DropOutcome::Reordered)
            }
            DragPlan::MoveSlot {
                id, to, to_index, ..
            } => {
                self.move_item(id, to, to_index).await?;
                Ok(DropOutcome::Moved(id))
            }
            DragPlan::Promote { entry, slot, index } => {
                let reward = reward_for(self.reward.as_ref(), &entry, self.config.daily_rate);
                let mutation = CreateItem::from_catalog(&entry, slot)
                    .at(index)
                    .with_reward(reward);
                let id = self.create_item_with(mutation).await?;
                Ok(DropOutcome::Promoted(id))
            }
        }
    }

    /// Applies `mutation`, awaits `remote` and settles the outcome. Without a
    /// remote call the mutation is confirmed at once.
    async fn run<M, F>(
        &self,
        mutation: &M,
        remote: Option<F>,
    ) -> Result<LocalId, TodayServiceError>
    where
        M: Mutation,
        F: Future<Output = RemoteResult<Confirmation>>,
    {
        let (pending, day) = {
            let mut state = self.state.borrow_mut();
            let now = (self.clock)();
            let pending = self.mutator.borrow_mut().begin(&mut state, mutation, now)?;
            (pending, state.date())
        };
        let entity = pending.entity;

        let Some(call) = remote else {
            let mut state = self.state.borrow_mut();
            self.mutator
                .borrow_mut()
                .confirm(&mut state, pending, Confirmation::Ack);
            return Ok(entity);
        };

        let outcome = call.await;

        let mut state = self.state.borrow_mut();
        let mut mutator = self.mutator.borrow_mut();
        if pending.kind == EntityKind::ScheduledItem && state.date() != day {
            mutator.abandon(pending);
            return outcome.map(|_| entity).map_err(Into::into);
        }
        match mutator.settle(&mut state, pending, outcome)? {
            Settlement::Applied(id) => Ok(id),
            Settlement::RolledBack | Settlement::Discarded(_) => Ok(entity),
        }
    }
}

fn confirmed(kind: EntityKind, id: LocalId) -> Result<ServerId, ValidationError> {
    id.server_id().ok_or_else(|| {
        warn!(
            "event=mutation_validate module=today_service status=error kind={} entity={} reason=unconfirmed",
            kind, id
        );
        ValidationError::Unconfirmed { kind, id }
    })
}

async fn acknowledged<F>(call: F) -> RemoteResult<Confirmation>
where
    F: Future<Output = RemoteResult<()>>,
{
    call.await.map(|()| Confirmation::Ack)
}
