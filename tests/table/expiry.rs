//! Lazy expiry and the reaper

use crate::common::*;
use doctable::ExpiryReaper;
use std::sync::Arc;
use std::time::Duration;

fn one_second_ago() -> Timestamp {
    Timestamp::now().saturating_sub(Duration::from_secs(1))
}

#[test]
fn test_expired_record_reads_as_absent() {
    let table = Table::new();
    table.set(pk("k"), b"v".to_vec(), Some(one_second_ago())).unwrap();

    assert!(table.get(&pk("k")).unwrap_err().is_not_found());
    // Still physically present until deleted or reaped
    assert_eq!(table.len(), 1);
    assert_eq!(table.expired_keys(Timestamp::now()), vec![pk("k")]);
}

#[test]
fn test_future_expiry_is_visible() {
    let table = Table::new();
    let later = Timestamp::after(Duration::from_secs(3600));
    table.set(pk("k"), b"v".to_vec(), Some(later)).unwrap();
    assert_eq!(table.get(&pk("k")).unwrap(), b"v".to_vec());
    assert_eq!(table.view(|tx| tx.expires_at(&pk("k"))).unwrap(), Some(later));
    assert!(table.expired_keys(Timestamp::now()).is_empty());
    assert_eq!(table.expired_keys(Timestamp::MAX), vec![pk("k")]);
}

#[test]
fn test_delete_expired_reports_not_found_but_removes() {
    let table = Table::new();
    table.set(pk("k"), b"v".to_vec(), Some(one_second_ago())).unwrap();
    assert!(table.delete(&pk("k")).unwrap_err().is_not_found());
    assert!(table.is_empty());
    assert!(table.expired_keys(Timestamp::MAX).is_empty());
}

#[test]
fn test_expired_records_hidden_from_index_scans() {
    let table = Table::new();
    let field = IndexField::json("age", IndexOpts::int(false)).unwrap();
    table.create_index("age", "*", Projector::single(field)).unwrap();
    table.set(pk("old"), person("a", "b", 30), Some(one_second_ago())).unwrap();
    table.set(pk("new"), person("c", "d", 40), None).unwrap();

    assert_eq!(ascend_keys(&table, "age"), vec![pk("new")]);
    // The entry itself is still there
    assert_eq!(table.view(|tx| tx.index_len("age")).unwrap(), 2);

    assert_eq!(table.purge_expired(Timestamp::now()), 1);
    assert_eq!(table.view(|tx| tx.index_len("age")).unwrap(), 1);
}

#[test]
fn test_clearing_expiry_on_update() {
    let table = Table::new();
    table.set(pk("k"), b"1".to_vec(), Some(Timestamp::from_secs(10))).unwrap();
    table.set(pk("k"), b"2".to_vec(), None).unwrap();
    assert_eq!(table.get(&pk("k")).unwrap(), b"2".to_vec());
    assert!(table.expired_keys(Timestamp::MAX).is_empty());
}

#[test]
fn test_expired_keys_in_expiry_order() {
    let table = Table::new();
    table.set(pk("c"), Vec::new(), Some(Timestamp::from_secs(1))).unwrap();
    table.set(pk("a"), Vec::new(), Some(Timestamp::from_secs(3))).unwrap();
    table.set(pk("b"), Vec::new(), Some(Timestamp::from_secs(2))).unwrap();
    assert_eq!(
        table.expired_keys(Timestamp::now()),
        vec![pk("c"), pk("b"), pk("a")]
    );
}

#[test]
fn test_reaper_purges_in_background() {
    init_tracing();
    let table = Arc::new(Table::new());
    for i in 0..10 {
        table
            .set(Key::Int(i), Vec::new(), Some(one_second_ago()))
            .unwrap();
    }
    table.set(Key::Int(100), Vec::new(), None).unwrap();

    let reaper = ExpiryReaper::new(Arc::clone(&table), Duration::from_millis(10)).unwrap();
    let handle = reaper.start();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while table.len() > 1 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    reaper.shutdown();
    handle.join().unwrap();

    assert_eq!(table.len(), 1);
    assert!(table.get(&Key::Int(100)).is_ok());
}
