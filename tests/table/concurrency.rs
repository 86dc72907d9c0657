//! Locking behaviour of the table handle

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
#[should_panic(expected = "nested transaction")]
fn test_nested_update_fails_fast() {
    let table = Table::new();
    table.update(|tx| {
        tx.set(pk("a"), Vec::new(), None).unwrap();
        // Re-entering the write lock from inside a transaction
        table.delete(&pk("a")).unwrap();
    });
}

#[test]
#[should_panic(expected = "nested transaction")]
fn test_read_inside_write_fails_fast() {
    let table = Table::new();
    table.update(|_| table.get(&pk("a")).is_ok());
}

#[test]
fn test_update_is_atomic_to_readers() {
    let table = Arc::new(Table::new());
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let table = Arc::clone(&table);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for round in 0..200i64 {
                table.update(|tx| {
                    // Both keys always change together
                    tx.set(pk("x"), round.to_string().into_bytes(), None).unwrap();
                    tx.set(pk("y"), round.to_string().into_bytes(), None).unwrap();
                });
            }
        })
    };
    let reader = {
        let table = Arc::clone(&table);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..200 {
                table.view(|tx| match (tx.get(&pk("x")), tx.get(&pk("y"))) {
                    (Ok(x), Ok(y)) => assert_eq!(x, y),
                    (Err(_), Err(_)) => {}
                    other => panic!("torn read: {:?}", other),
                });
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn test_parallel_writers_with_index() {
    let table = Arc::new(Table::new());
    let field = IndexField::json("age", IndexOpts::int(false)).unwrap();
    table.create_index("age", "*", Projector::single(field)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = pk(&format!("t{}:{:03}", t, i));
                    table.set(key, person("a", "b", i), None).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(table.len(), 800);
    assert_eq!(table.view(|tx| tx.index_len("age")).unwrap(), 800);
}
