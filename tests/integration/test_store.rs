//! Tests for annotation store eviction behavior.

use std::time::Duration;

use chrono::{TimeDelta, Utc};

use tributary::{Annotation, AnnotationStore, Payload, TextAnswer};

fn aged_annotation(source: &str, age_secs: i64) -> Annotation {
    let mut annotation = Annotation::new(source, "q", Payload::Text(TextAnswer::new("a")));
    annotation.created_at = Utc::now() - TimeDelta::seconds(age_secs);
    annotation
}

#[test]
fn test_remove_older_than_is_idempotent() {
    let store = AnnotationStore::new();
    store.insert(aged_annotation("a", 400));
    store.insert(aged_annotation("b", 200));
    store.insert(aged_annotation("c", 10));

    let first = store.remove_older_than(Duration::from_secs(300));
    let second = store.remove_older_than(Duration::from_secs(300));

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_age_invariant_after_prune() {
    let store = AnnotationStore::new();
    for age in [5, 50, 299, 301, 500, 3600] {
        store.insert(aged_annotation("s", age));
    }

    store.remove_older_than(Duration::from_secs(300));

    assert_eq!(store.len(), 3);
    for annotation in store.snapshot() {
        assert!(annotation.age().num_seconds() <= 300);
    }
}

#[test]
fn test_prune_keeps_insertion_order_of_survivors() {
    let store = AnnotationStore::new();
    store.insert(aged_annotation("first", 10));
    store.insert(aged_annotation("expired", 900));
    store.insert(aged_annotation("second", 20));

    store.remove_older_than(Duration::from_secs(300));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].source, "first");
    assert_eq!(snapshot[1].source, "second");
}

#[test]
fn test_nothing_dropped_without_prune() {
    let store = AnnotationStore::new();
    for age in [900, 1800, 3600] {
        store.insert(aged_annotation("old", age));
    }

    // Ancient entries stay until someone asks for eviction.
    assert_eq!(store.len(), 3);
    store.remove_older_than(Duration::from_secs(60));
    assert_eq!(store.len(), 0);
}
