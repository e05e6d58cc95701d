use chrono::NaiveDate;
use futures::executor::block_on;
use lazyplan_core::{
    merge_order, EngineConfig, EntryStatus, InMemoryStore, LocalId, RemoteEntry, Slot,
    TodayService,
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

#[test]
fn merge_keeps_existing_order_and_appends_new_ids() {
    assert_eq!(merge_order(&["a", "b", "c"], &["b", "c", "d"]), vec!["b", "c", "d"]);
    assert_eq!(merge_order(&["c", "a"], &["a", "b", "c"]), vec!["c", "a", "b"]);
}

#[test]
fn merge_drops_vanished_ids() {
    assert_eq!(merge_order(&["a", "b", "c"], &["a"]), vec!["a"]);
    assert!(merge_order(&["a", "b"], &[] as &[&str]).is_empty());
}

#[test]
fn merge_is_idempotent() {
    let order = vec![3, 1, 2];
    assert_eq!(merge_order(&order, &order), order);
    let merged = merge_order(&order, &[2, 4, 1, 3]);
    assert_eq!(merge_order(&merged, &merged), merged);
}

#[test]
fn repeated_fresh_ids_are_appended_once() {
    assert_eq!(merge_order(&[1], &[2, 2, 1, 2]), vec![1, 2]);
}

#[test]
fn refresh_does_not_reshuffle_user_order() {
    let store = InMemoryStore::new();
    for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
        store.insert_entry(entry(id, Slot::Morning, name));
    }
    let service = TodayService::new(store, day(), EngineConfig::default()).unwrap();
    block_on(service.refresh()).unwrap();
    service.reorder(Slot::Morning, 2, 0).unwrap();
    assert_eq!(
        service.with_state(|state| state.titles_in(Slot::Morning)),
        vec!["C", "A", "B"]
    );

    service.remote().insert_entry(entry(4, Slot::Morning, "D"));
    let report = block_on(service.refresh()).unwrap();

    assert_eq!(report.entries.added, 1);
    assert_eq!(
        service.with_state(|state| state.titles_in(Slot::Morning)),
        vec!["C", "A", "B", "D"]
    );
    assert!(service.with_state(|state| state.is_consistent()));
}

#[test]
fn refresh_picks_up_remote_attribute_and_slot_changes() {
    let store = InMemoryStore::new();
    store.insert_entry(entry(1, Slot::Morning, "A"));
    store.insert_entry(entry(2, Slot::Morning, "B"));
    let service = TodayService::new(store, day(), EngineConfig::default()).unwrap();
    block_on(service.refresh()).unwrap();

    let mut moved = entry(1, Slot::Evening, "A renamed");
    moved.status = EntryStatus::Completed;
    service.remote().insert_entry(moved);
    block_on(service.refresh()).unwrap();

    service.with_state(|state| {
        assert_eq!(state.titles_in(Slot::Morning), vec!["B"]);
        assert_eq!(state.titles_in(Slot::Evening), vec!["A renamed"]);
        assert!(state.item(LocalId::Server(1)).unwrap().completed);
        assert!(state.is_consistent());
    });
}
