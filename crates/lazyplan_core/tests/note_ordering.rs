use chrono::{DateTime, FixedOffset, NaiveDate};
use futures::executor::block_on;
use lazyplan_core::{
    compare_recency, is_render_ordered, EngineConfig, InMemoryStore, LocalId, RemoteNote,
    TimeComparator, TimeValue, TodayService,
};
use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

fn remote_note(id: i64, content: &str, updated_at: &str, pinned: bool) -> RemoteNote {
    RemoteNote {
        id,
        content: content.to_string(),
        created_at: updated_at.to_string(),
        updated_at: updated_at.to_string(),
        pinned,
    }
}

fn config() -> EngineConfig {
    EngineConfig {
        utc_offset_minutes: Some(0),
        ..EngineConfig::default()
    }
}

/// Clock that advances one minute per reading.
fn ticking_clock() -> impl Fn() -> DateTime<FixedOffset> {
    let start = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z").unwrap();
    let ticks = Rc::new(Cell::new(0i64));
    move || {
        let tick = ticks.get();
        ticks.set(tick + 1);
        start + chrono::Duration::minutes(tick)
    }
}

fn contents(service: &TodayService<InMemoryStore>) -> Vec<String> {
    service.with_state(|state| state.notes().iter().map(|note| note.content.clone()).collect())
}

fn assert_partitioned(service: &TodayService<InMemoryStore>) {
    service.with_state(|state| {
        let notes = state.notes().as_slice();
        assert!(is_render_ordered(notes, state.notes().comparator()));
        let first_unpinned = notes.iter().position(|note| !note.pinned).unwrap_or(notes.len());
        assert!(notes[first_unpinned..].iter().all(|note| !note.pinned));
    });
}

#[test]
fn mixed_timestamp_formats_compare_by_instant() {
    let local: TimeValue = "2024-01-02 10:00".into();
    let iso: TimeValue = "2024-01-01T09:00:00.000Z".into();
    assert_eq!(compare_recency(&local, &iso), Ordering::Less);
    assert_eq!(compare_recency(&iso, &local), Ordering::Greater);

    let db: TimeValue = "2024-01-01 09:00:00.000000+00".into();
    assert_eq!(compare_recency(&iso, &db), Ordering::Equal);

    let comparator = TimeComparator::utc();
    assert_eq!(comparator.sort_key_str("not a date "), "not a date");
}

#[test]
fn loaded_notes_render_pinned_first_then_newest() {
    let store = InMemoryStore::new();
    store.insert_note(remote_note(1, "old pinned", "2024-01-01 08:00:00+00", true));
    store.insert_note(remote_note(2, "new", "2024-01-03T08:00:00Z", false));
    store.insert_note(remote_note(3, "newer pinned", "2024-01-02 08:00", true));
    store.insert_note(remote_note(4, "old", "2024-01-01", false));
    let service = TodayService::new(
        store,
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        config(),
    )
    .unwrap();

    block_on(service.refresh()).unwrap();
    assert_eq!(contents(&service), vec!["newer pinned", "old pinned", "new", "old"]);
}

#[test]
fn partition_holds_after_every_local_mutation() {
    let store = InMemoryStore::new();
    store.insert_note(remote_note(1, "seed a", "2024-01-01 08:00:00+00", false));
    store.insert_note(remote_note(2, "seed b", "2024-01-01 09:00:00+00", true));
    let service = TodayService::new(
        store,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        config(),
    )
    .unwrap()
    .with_clock(ticking_clock());
    block_on(service.refresh()).unwrap();
    assert_partitioned(&service);

    let created = block_on(service.create_note("fresh")).unwrap();
    assert_partitioned(&service);
    block_on(service.set_note_pinned(created, true)).unwrap();
    assert_partitioned(&service);
    block_on(service.edit_note(LocalId::Server(1), "seed a edited")).unwrap();
    assert_partitioned(&service);
    block_on(service.set_note_pinned(LocalId::Server(2), false)).unwrap();
    assert_partitioned(&service);
    block_on(service.delete_note(created)).unwrap();
    assert_partitioned(&service);

    assert_eq!(contents(&service), vec!["seed a edited", "seed b"]);
}

#[test]
fn pin_toggle_keeps_recency_within_partition() {
    let store = InMemoryStore::new();
    store.insert_note(remote_note(1, "a", "2024-01-01 08:00:00+00", false));
    store.insert_note(remote_note(2, "b", "2024-01-01 09:00:00+00", false));
    store.insert_note(remote_note(3, "c", "2024-01-01 10:00:00+00", false));
    let service = TodayService::new(
        store,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        config(),
    )
    .unwrap();
    block_on(service.refresh()).unwrap();

    block_on(service.set_note_pinned(LocalId::Server(1), true)).unwrap();
    assert_eq!(contents(&service), vec!["a", "c", "b"]);
    block_on(service.set_note_pinned(LocalId::Server(1), false)).unwrap();
    assert_eq!(contents(&service), vec!["c", "b", "a"]);
}
