//! Integration tests for sources and derived pipelines.

use parking_lot::Mutex;
use std::sync::Arc;
use tributary::{
    Draft, Event, Manual, ManualMap, MapSourceExt, Source, SourceExt, Subscription,
};

fn record<S: Source<Vec<T>>, T: tributary::Element>(
    source: &S,
) -> (Subscription<Vec<T>>, Arc<Mutex<Vec<Event<T>>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let sub = source.subscribe_with(Arc::new(tributary::FnReceiver::<Vec<T>, _>::new(
        move |e: &Event<T>| sink.lock().push(e.clone()),
    )));
    (sub, events)
}

// --- Concrete Scenarios ---

#[test]
fn test_batched_push_then_pop_is_silent() {
    let source = Manual::from_vec(vec![1, 2, 3]);
    let (sub, events) = record(&source);

    source
        .batch(|s| {
            s.push(4).unwrap();
            s.remove_last().unwrap();
        })
        .unwrap();

    assert!(events.lock().is_empty());
    assert_eq!(sub.snapshot().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_draft_unshift_then_shift_is_noop() {
    let mut draft = Draft::new(3);
    draft.prepend(vec!['a']).unwrap();
    draft.remove_first().unwrap();
    assert_eq!(draft.commit(), None);
}

#[test]
fn test_filter_assign_brings_element_in() {
    let source = Manual::from_vec(vec![1, 2, 3, 4, 5]);
    let evens = source.filter(|n| n % 2 == 0);
    let (sub, events) = record(&evens);

    source.assign(0, 2).unwrap();

    assert_eq!(*events.lock(), vec![Event::Prepend { values: vec![2] }]);
    assert_eq!(sub.snapshot().unwrap(), vec![2, 2, 4]);
}

#[test]
fn test_sorted_single_insertions() {
    let source: Manual<i32> = Manual::new();
    let sorted = source.sort();
    let (sub, events) = record(&sorted);

    for n in [5, 1, 3] {
        source.push(n).unwrap();
    }

    assert_eq!(
        *events.lock(),
        vec![
            Event::Append { values: vec![5] },
            Event::Prepend { values: vec![1] },
            Event::Splice {
                index: 1,
                delete: 0,
                insert: vec![3]
            },
        ]
    );
    assert_eq!(sub.snapshot().unwrap(), vec![1, 3, 5]);
}

#[test]
fn test_entries_non_contiguous_deletion() {
    let map: ManualMap<&'static str, i32> =
        [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
    let entries = map.entries();
    let (sub, events) = record(&entries);

    map.batch(|m| {
        m.remove(&"a").unwrap();
        m.remove(&"c").unwrap();
    })
    .unwrap();

    let events = events.lock();
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Composite { events } => assert_eq!(events.len(), 2),
        other => panic!("expected composite, got {other:?}"),
    }
    assert_eq!(sub.snapshot().unwrap(), vec![("b", 2)]);
}

// --- Pipelines ---

#[test]
fn test_replaying_events_reproduces_view() {
    let source = Manual::from_vec(vec![7, 3, 9, 4]);
    let view = source.filter(|n| *n > 3).map(|n| n * 2).sort();
    let (sub, events) = record(&view);
    let mut replica = sub.snapshot().unwrap();

    source.push(10).unwrap();
    source.assign(1, 8).unwrap();
    source.range_replace(0, 2, [1, 2, 6]).unwrap();
    source.batch(|s| {
        s.prepend([5]).unwrap();
        s.remove_last().unwrap();
    })
    .unwrap();
    source.clear().unwrap();
    source.append([4, 11]).unwrap();

    for event in events.lock().iter() {
        event.apply(&mut replica).unwrap();
    }
    assert_eq!(replica, sub.snapshot().unwrap());
    assert_eq!(replica, vec![8, 22]);
}

#[test]
fn test_concatenated_views_follow_both_sides() {
    let todo = Manual::from_vec(vec!["write".to_string()]);
    let done = Manual::from_vec(vec!["plan".to_string()]);
    let all = todo.concat(done.clone()).map(|s| s.to_uppercase());
    let (sub, _events) = record(&all);

    done.push("test".to_string()).unwrap();
    todo.prepend(["design".to_string()]).unwrap();

    assert_eq!(
        sub.snapshot().unwrap(),
        vec!["DESIGN", "WRITE", "PLAN", "TEST"]
    );
}

#[test]
fn test_for_each_drives_side_effects() {
    let source = Manual::from_vec(vec![1, 2]);
    let total = Arc::new(Mutex::new(0));
    let acc = Arc::clone(&total);
    let sub = source.filter(|n| n % 2 == 1).for_each(move |n| *acc.lock() += n);

    source.append([3, 4, 5]).unwrap();
    assert_eq!(*total.lock(), 1 + 3 + 5);

    sub.release();
    source.push(7).unwrap();
    assert_eq!(*total.lock(), 9);
}

#[test]
fn test_entries_then_filter() {
    let scores: ManualMap<&'static str, u32> = ManualMap::new();
    let passing = scores.entries().filter(|(_, score)| *score >= 50);
    let (sub, _events) = record(&passing);

    scores.set("ann", 70).unwrap();
    scores.set("bob", 20).unwrap();
    scores.set("cat", 55).unwrap();
    scores.set("bob", 90).unwrap();
    scores.remove(&"ann").unwrap();

    assert_eq!(sub.snapshot().unwrap(), vec![("bob", 90), ("cat", 55)]);
}

#[test]
fn test_shared_source_erases_type() {
    let source = Manual::from_vec(vec![3, 1, 2]);
    let erased = source.sort().shared();
    let (sub, _events) = record(&erased);
    source.push(0).unwrap();
    assert_eq!(sub.snapshot().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn test_event_serialized_shape() {
    let event = Event::Splice {
        index: 1,
        delete: 2,
        insert: vec!["x"],
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"kind": "splice", "index": 1, "delete": 2, "insert": ["x"]})
    );
}
