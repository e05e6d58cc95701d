use chrono::NaiveDate;
use futures::executor::block_on;
use lazyplan_core::{
    CatalogEntry, CatalogKind, DragAbort, DragEnd, DragKey, DropLocation, DropOutcome,
    EngineConfig, EntryPatch, EntryStatus, InMemoryStore, LocalId, RemoteCall, RemoteEntry,
    RemoteOp, Slot, TodayService, TodayServiceError,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn entry(id: i64, slot: Slot, name: &str) -> RemoteEntry {
    RemoteEntry {
        id,
        slot,
        date: day(),
        status: EntryStatus::Ongoing,
        source_kind: "custom".to_string(),
        task_id: None,
        habit_id: None,
        display_name: Some(name.to_string()),
    }
}

fn board(entries: &[(i64, Slot, &str)]) -> TodayService<InMemoryStore> {
    let store = InMemoryStore::new();
    for (id, slot, name) in entries {
        store.insert_entry(entry(*id, *slot, name));
    }
    store.set_catalog(
        CatalogKind::Task,
        vec![CatalogEntry::new(100, CatalogKind::Task, "Plan week")],
    );
    store.set_catalog(
        CatalogKind::Habit,
        vec![CatalogEntry::new(100, CatalogKind::Habit, "Stretch")],
    );
    let service = TodayService::new(store, day(), EngineConfig::default()).unwrap();
    block_on(service.refresh()).unwrap();
    service.remote().clear_calls();
    service
}

fn drop_scheduled(
    service: &TodayService<InMemoryStore>,
    id: i64,
    from: (Slot, usize),
    to: Option<DropLocation>,
) -> Result<DropOutcome, TodayServiceError> {
    let key = DragKey::scheduled(from.0, LocalId::Server(id));
    service.start_drag(key);
    block_on(service.handle_drop(DragEnd {
        key,
        source: DropLocation::slot(from.0, from.1),
        destination: to,
    }))
}

fn titles(service: &TodayService<InMemoryStore>, slot: Slot) -> Vec<String> {
    service.with_state(|state| state.titles_in(slot))
}

#[test]
fn same_list_reorder_moves_index_zero_to_two() {
    let service = board(&[
        (1, Slot::Morning, "A"),
        (2, Slot::Morning, "B"),
        (3, Slot::Morning, "C"),
        (4, Slot::Morning, "D"),
    ]);

    let outcome = drop_scheduled(
        &service,
        1,
        (Slot::Morning, 0),
        Some(DropLocation::slot(Slot::Morning, 2)),
    )
    .unwrap();

    assert_eq!(outcome, DropOutcome::Reordered);
    assert_eq!(titles(&service, Slot::Morning), vec!["B", "C", "A", "D"]);
    assert!(service.remote().calls().is_empty());
}

#[test]
fn cross_slot_move_issues_exactly_one_slot_update() {
    let service = board(&[
        (1, Slot::Morning, "X"),
        (2, Slot::Morning, "Y"),
        (3, Slot::Afternoon, "Z"),
    ]);

    let outcome = drop_scheduled(
        &service,
        1,
        (Slot::Morning, 0),
        Some(DropLocation::slot(Slot::Afternoon, 0)),
    )
    .unwrap();

    assert_eq!(outcome, DropOutcome::Moved(LocalId::Server(1)));
    assert_eq!(titles(&service, Slot::Morning), vec!["Y"]);
    assert_eq!(titles(&service, Slot::Afternoon), vec!["X", "Z"]);
    assert_eq!(
        service.remote().calls(),
        vec![RemoteCall::UpdateEntry {
            id: 1,
            patch: EntryPatch::slot(Slot::Afternoon),
        }]
    );
    assert_eq!(service.remote().entry(1).unwrap().slot, Slot::Afternoon);
}

#[test]
fn failed_cross_slot_move_restores_both_slots() {
    let service = board(&[
        (1, Slot::Morning, "X"),
        (2, Slot::Morning, "Y"),
        (3, Slot::Afternoon, "Z"),
    ]);
    service.remote().fail(RemoteOp::UpdateEntry);

    let err = drop_scheduled(
        &service,
        1,
        (Slot::Morning, 0),
        Some(DropLocation::slot(Slot::Afternoon, 1)),
    )
    .unwrap_err();

    assert!(matches!(err, TodayServiceError::Remote(_)));
    assert_eq!(titles(&service, Slot::Morning), vec!["X", "Y"]);
    assert_eq!(titles(&service, Slot::Afternoon), vec!["Z"]);
    assert!(service.with_state(|state| state.is_consistent()));
}

#[test]
fn bad_source_index_aborts_without_mutation_or_calls() {
    let service = board(&[(1, Slot::Morning, "A"), (2, Slot::Morning, "B")]);
    let before = service.snapshot();

    let err = drop_scheduled(
        &service,
        1,
        (Slot::Morning, 5),
        Some(DropLocation::slot(Slot::Evening, 0)),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        TodayServiceError::Drag(DragAbort::SourceIndexOutOfBounds { index: 5, len: 2, .. })
    ));
    assert_eq!(titles(&service, Slot::Morning), before.titles_in(Slot::Morning));
    assert!(titles(&service, Slot::Evening).is_empty());
    assert!(service.remote().calls().is_empty());
    assert_eq!(service.pending_count(), 0);
}

#[test]
fn bad_catalog_index_aborts_promotion() {
    let service = board(&[]);
    let key = DragKey::catalog(CatalogKind::Task, 100);
    service.start_drag(key);

    let err = block_on(service.handle_drop(DragEnd {
        key,
        source: DropLocation::catalog(CatalogKind::Task, 3),
        destination: Some(DropLocation::slot(Slot::Morning, 0)),
    }))
    .unwrap_err();

    assert!(matches!(err, TodayServiceError::Drag(_)));
    assert_eq!(service.with_state(|state| state.item_count()), 0);
    assert!(service.remote().calls().is_empty());
}

#[test]
fn catalog_ids_do_not_collide_across_lists() {
    let service = board(&[(1, Slot::Evening, "Existing")]);
    let key = DragKey::catalog(CatalogKind::Habit, 100);
    service.start_drag(key);

    let outcome = block_on(service.handle_drop(DragEnd {
        key,
        source: DropLocation::catalog(CatalogKind::Habit, 0),
        destination: Some(DropLocation::slot(Slot::Evening, 0)),
    }))
    .unwrap();

    assert!(matches!(outcome, DropOutcome::Promoted(_)));
    assert_eq!(titles(&service, Slot::Evening), vec!["Stretch", "Existing"]);
    assert!(matches!(
        service.remote().calls().as_slice(),
        [RemoteCall::CreateEntry(data)]
            if data.slot == Slot::Evening && data.date == day()
    ));
}

#[test]
fn drop_outside_any_list_is_noop() {
    let service = board(&[(1, Slot::Morning, "A")]);
    let outcome = drop_scheduled(&service, 1, (Slot::Morning, 0), None).unwrap();
    assert_eq!(outcome, DropOutcome::Noop);
    assert!(service.remote().calls().is_empty());
}

#[test]
fn drop_without_start_is_rejected() {
    let service = board(&[(1, Slot::Morning, "A"), (2, Slot::Morning, "B")]);
    let key = DragKey::scheduled(Slot::Morning, LocalId::Server(1));
    let err = block_on(service.handle_drop(DragEnd {
        key,
        source: DropLocation::slot(Slot::Morning, 0),
        destination: Some(DropLocation::slot(Slot::Morning, 1)),
    }))
    .unwrap_err();
    assert_eq!(err, TodayServiceError::Drag(DragAbort::NotDragging));
    assert_eq!(titles(&service, Slot::Morning), vec!["A", "B"]);
}
