//! Behaviour every backend must share. Each check starts from an empty store.

use jiff::Timestamp;
use shortlink_storage::{ClickStats, Link, ReadStorage, Storage, StorageError};
use std::collections::{HashMap, HashSet};

pub fn ts(seconds: i64) -> Timestamp {
    Timestamp::from_second(seconds).unwrap()
}

fn stats(entries: &[(&str, u64)]) -> ClickStats {
    entries
        .iter()
        .map(|&(short, clicks)| (short.to_string(), clicks))
        .collect()
}

pub fn round_trip<S: Storage>(storage: &S) {
    let t1 = ts(1_700_000_000);
    storage
        .save(&Link::new("foo", "http://example.com", "alice", t1))
        .unwrap();

    let link = storage.load("foo").unwrap();
    assert_eq!(link.long, "http://example.com");
    assert_eq!(link.owner, "alice");
    assert_eq!(link.created, t1);
    assert_eq!(link.last_edit, t1);
}

pub fn upsert_replaces<S: Storage>(storage: &S) {
    storage
        .save(&Link::new("foo", "http://one.example", "alice", ts(1)))
        .unwrap();
    storage
        .save(&Link::new("foo", "http://two.example", "alice", ts(2)))
        .unwrap();

    let all = storage.load_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].long, "http://two.example");
    assert_eq!(storage.load("foo").unwrap().last_edit, ts(2));
}

pub fn upsert_across_spellings<S: Storage>(storage: &S) {
    storage
        .save(&Link::new("Team-Docs", "http://one.example", "alice", ts(1)))
        .unwrap();
    storage
        .save(&Link::new("teamdocs", "http://two.example", "bob", ts(2)))
        .unwrap();

    let all = storage.load_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].short, "teamdocs");
    assert_eq!(storage.load("TEAM-DOCS").unwrap().owner, "bob");
}

pub fn unknown_is_not_found<S: Storage>(storage: &S) {
    let err = storage.load("does-not-exist").unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err:?}");
    assert_eq!(err, StorageError::NotFound("doesnotexist".to_string()));
}

pub fn load_all_membership<S: Storage>(storage: &S) {
    for (short, long) in [("a", "http://a.example"), ("b", "http://b.example"), ("c", "http://c.example")] {
        storage.save(&Link::new(short, long, "alice", ts(1))).unwrap();
    }

    let all: HashMap<String, String> = storage
        .load_all()
        .unwrap()
        .into_iter()
        .map(|link| (link.short, link.long))
        .collect();

    let expected: HashMap<String, String> = [
        ("a", "http://a.example"),
        ("b", "http://b.example"),
        ("c", "http://c.example"),
    ]
    .into_iter()
    .map(|(short, long)| (short.to_string(), long.to_string()))
    .collect();
    assert_eq!(all, expected);
}

pub fn returned_values_are_copies<S: Storage>(storage: &S) {
    storage
        .save(&Link::new("foo", "http://example.com", "alice", ts(1)))
        .unwrap();

    let mut link = storage.load("foo").unwrap();
    link.long = "http://changed.example".to_string();

    assert_eq!(storage.load("foo").unwrap().long, "http://example.com");
}

pub fn stats_accumulate<S: Storage>(storage: &S) {
    storage
        .save(&Link::new("foo", "http://example.com", "alice", ts(1)))
        .unwrap();

    storage.save_stats(&stats(&[("foo", 3)])).unwrap();
    storage.save_stats(&stats(&[("foo", 2)])).unwrap();

    assert_eq!(storage.load_stats().unwrap()["foo"], 5);
}

pub fn stats_keyed_by_display_name<S: Storage>(storage: &S) {
    storage
        .save(&Link::new("Team-Docs", "http://docs.example", "alice", ts(1)))
        .unwrap();

    storage
        .save_stats(&stats(&[("team-docs", 1), ("TEAMDOCS", 2)]))
        .unwrap();
    storage.save_stats(&stats(&[("Team-Docs", 4)])).unwrap();

    assert_eq!(storage.load_stats().unwrap(), stats(&[("Team-Docs", 7)]));
}

pub fn stats_drop_orphans<S: Storage>(storage: &S) {
    storage
        .save(&Link::new("foo", "http://example.com", "alice", ts(1)))
        .unwrap();

    storage.save_stats(&stats(&[("foo", 1), ("bar", 4)])).unwrap();

    let totals = storage.load_stats().unwrap();
    assert!(!totals.contains_key("bar"));
    assert_eq!(totals, stats(&[("foo", 1)]));
}

pub fn empty_stats<S: Storage>(storage: &S) {
    storage.save_stats(&ClickStats::new()).unwrap();
    assert!(storage.load_stats().unwrap().is_empty());
}

pub fn concurrent_writers<S: Storage>(storage: &S) {
    const WRITERS: usize = 16;

    std::thread::scope(|scope| {
        for i in 0..WRITERS {
            scope.spawn(move || {
                let short = format!("link-{i:02}");
                let long = format!("http://example{i}.com");
                storage.save(&Link::new(short, long, "alice", ts(1))).unwrap();
            });
        }
    });

    let shorts: HashSet<String> = storage
        .load_all()
        .unwrap()
        .into_iter()
        .map(|link| link.short)
        .collect();
    let expected: HashSet<String> = (0..WRITERS).map(|i| format!("link-{i:02}")).collect();
    assert_eq!(shorts, expected);
}
