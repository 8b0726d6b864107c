use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use pumpfs::fs::Filesystem;
use pumpfs::record::Record;
use pumpfs::store::{Batch, EntryKind, Store, LATEST_NAME, LOG_NAME};

fn batch(line: &str, secs: i64) -> Batch {
    let at = Utc.timestamp_opt(secs, 0).unwrap();
    Batch::new(Record::parse(line, at).unwrap())
}

#[test]
fn eviction_keeps_the_most_recent_readings() {
    let store = Store::new(3);

    for secs in 100..110 {
        store.publish(batch("1;2", secs));
    }

    assert_eq!(store.reading_count(), 3);

    let names = store.names();
    for evicted in 100..107 {
        assert!(!names.contains(&evicted.to_string()));
    }
    for kept in 107..110 {
        assert!(names.contains(&kept.to_string()));
    }

    assert_eq!(store.latest(), Some("109".to_string()));
}

#[test]
fn eviction_below_the_bound_is_a_noop() {
    let store = Store::new(5);

    for secs in 100..103 {
        store.publish(batch("1;2", secs));
    }

    assert_eq!(store.reading_count(), 3);
    for kept in 100..103 {
        assert!(store.get(&kept.to_string()).is_some());
    }
}

#[test]
fn a_new_batch_fully_replaces_the_previous_one() {
    let store = Store::new(10);

    store.publish(batch("1;2;3", 100));
    assert_eq!(store.get(".f3").unwrap().payload(), "3");

    let mut second = batch("9;8", 101);
    second.push_derived("cop", "0.888");
    store.publish(second);

    assert_eq!(store.get(".f1").unwrap().payload(), "9");
    assert_eq!(store.get(".f2").unwrap().payload(), "8");
    assert!(store.get(".f3").is_none());
    assert_eq!(store.get("cop").unwrap().payload(), "0.888");

    // A third batch without derived values drops `cop` too.
    store.publish(batch("4;5", 102));
    assert!(store.get("cop").is_none());

    // History readings survive batch replacement.
    assert_eq!(store.reading_count(), 3);
}

#[test]
fn payload_round_trips_through_read() {
    let store = Arc::new(Store::new(10));
    store.publish(batch("12.5;98.3;1", 1_651_246_965));

    let fs = Filesystem::new(store);

    let payload = b"1651246965;12.5;98.3;1";
    assert_eq!(fs.read("/1651246965", 1024, 0), payload);
    assert_eq!(fs.read("/1651246965", payload.len() as u32, 0), payload);
}

#[test]
fn read_boundaries_never_error() {
    let store = Arc::new(Store::new(10));
    store.publish(batch("abc", 100));

    let fs = Filesystem::new(store);

    // "100;abc"
    assert_eq!(fs.read("/100", 3, 4), b"abc");
    assert_eq!(fs.read("/100", 1024, 4), b"abc");
    assert_eq!(fs.read("/100", 1024, 7), b"");
    assert_eq!(fs.read("/100", 1024, 8), b"");
    assert_eq!(fs.read("/unknown", 1024, 0), b"");
}

#[test]
fn latest_is_a_symlink_to_the_newest_reading() {
    let store = Arc::new(Store::new(2));
    store.publish(batch("1", 100));
    store.publish(batch("2", 101));

    let fs = Filesystem::new(store.clone());

    assert_eq!(fs.getattr("/latest").unwrap().kind, EntryKind::Symlink);
    assert_eq!(fs.readlink("/latest").unwrap(), "101");

    // The target always exists.
    assert!(store.get("101").is_some());
}

#[test]
fn log_lines_read_back() {
    let store = Arc::new(Store::new(10));
    store.append_log("Main program starting");
    store.append_log("Keeping 10 readings");

    let fs = Filesystem::new(store);

    assert_eq!(
        fs.read(&format!("/{LOG_NAME}"), 1024, 0),
        b"Main program starting\nKeeping 10 readings\n"
    );
}

#[test]
fn concurrent_put_and_list_see_consistent_snapshots() {
    let store = Arc::new(Store::new(16));
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);

        thread::spawn(move || {
            for i in 0..500i64 {
                // Keep the two fields coupled so snapshot consistency
                // is checkable from the outside.
                store.publish(batch(&format!("{i};{}", i * 2), i));
            }
            done.store(true, Ordering::Release);
        })
    };

    while !done.load(Ordering::Acquire) {
        let snapshot = store.list();

        // No duplicates.
        let mut names: Vec<&str> = snapshot.iter().map(|e| e.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), snapshot.len());

        let field = |name: &str| {
            snapshot
                .iter()
                .find(|e| e.name() == name)
                .map(|e| e.payload().parse::<i64>().unwrap())
        };

        // Both fields of a batch appear together or not at all.
        if let (Some(f1), Some(f2)) = (field(".f1"), field(".f2")) {
            assert_eq!(f2, f1 * 2);
        }

        // A visible latest pointer has a visible target.
        if let Some(latest) = snapshot.iter().find(|e| e.name() == LATEST_NAME) {
            assert!(snapshot.iter().any(|e| e.name() == latest.payload()));
        }

        // History entries are self-describing.
        for entry in &snapshot {
            if entry.name().chars().all(|c| c.is_ascii_digit()) {
                assert!(entry.payload().starts_with(&format!("{};", entry.name())));
            }
        }
    }

    producer.join().unwrap();

    assert_eq!(store.reading_count(), 16);
    assert_eq!(store.latest(), Some("499".to_string()));
}
