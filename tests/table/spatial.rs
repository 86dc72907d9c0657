//! Spatial indexes: nearest-neighbour and intersection search

use crate::common::*;
use doctable::{parse_rect, DistanceMode, IndexKind, TableConfig};

fn fleet(config: TableConfig) -> Table {
    let table = Table::with_config(config).unwrap();
    table
        .create_spatial_index("fleet", "fleet:*", Projector::single(IndexField::rect()))
        .unwrap();
    table.set(pk("fleet:0:pos"), b"[-115.567 33.532]".to_vec(), None).unwrap();
    table.set(pk("fleet:1:pos"), b"[-116.671 35.735]".to_vec(), None).unwrap();
    table.set(pk("fleet:2:pos"), b"[-113.902 31.234]".to_vec(), None).unwrap();
    table
}

fn nearby(table: &Table, target: &Rect) -> Vec<(Key, f64)> {
    table.view(|tx| {
        let mut out = Vec::new();
        tx.nearby("fleet", target, |k, _, dist| {
            out.push((k.clone(), dist));
            true
        })
        .unwrap();
        out
    })
}

#[test]
fn test_nearby_orders_by_distance() {
    let table = fleet(TableConfig::default());
    let target = parse_rect("[-113 33]").unwrap();
    let found = nearby(&table, &target);
    let keys: Vec<Key> = found.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, vec![pk("fleet:2:pos"), pk("fleet:0:pos"), pk("fleet:1:pos")]);
    assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
    assert!((found[0].1 - (0.902f64.powi(2) + 1.766f64.powi(2)).sqrt()).abs() < 1e-9);
}

#[test]
fn test_nearby_center_distance_mode() {
    let config = TableConfig::new().with_nearby_distance(DistanceMode::Center);
    let table = fleet(config);
    table
        .set(pk("fleet:3:area"), b"[-113.5 32.5],[-112.5 40]".to_vec(), None)
        .unwrap();
    let target = parse_rect("[-113 33]").unwrap();
    let keys: Vec<Key> = nearby(&table, &target).into_iter().map(|(k, _)| k).collect();
    // The box covers the target but its center is far away
    assert_eq!(keys[0], pk("fleet:2:pos"));
    assert_eq!(keys.len(), 4);
}

#[test]
fn test_intersects() {
    let table = fleet(TableConfig::for_testing());
    let window = parse_rect("[-116 31],[-113 34]").unwrap();
    let mut found = table.view(|tx| collect(|v| tx.intersects("fleet", &window, v).unwrap()));
    found.sort();
    assert_eq!(found, vec![pk("fleet:0:pos"), pk("fleet:2:pos")]);
}

#[test]
fn test_spatial_index_follows_updates() {
    let table = fleet(TableConfig::for_testing());
    let target = parse_rect("[-113 33]").unwrap();

    table.set(pk("fleet:1:pos"), b"[-113 33.1]".to_vec(), None).unwrap();
    assert_eq!(nearby(&table, &target)[0].0, pk("fleet:1:pos"));

    table.delete(&pk("fleet:1:pos")).unwrap();
    assert_eq!(nearby(&table, &target).len(), 2);

    // Not a rectangle: left out of the index
    table.set(pk("fleet:2:pos"), b"parked".to_vec(), None).unwrap();
    assert_eq!(nearby(&table, &target).len(), 1);
    assert_eq!(table.view(|tx| tx.index_kind("fleet")).unwrap(), IndexKind::Spatial);
}

#[test]
fn test_json_rect_index() {
    let table = Table::new();
    table
        .create_spatial_index("loc", "*", Projector::single(IndexField::json_rect("loc").unwrap()))
        .unwrap();
    table.set(pk("a"), br#"{"loc":[1,1]}"#.to_vec(), None).unwrap();
    table.set(pk("b"), br#"{"loc":"[5 5]"}"#.to_vec(), None).unwrap();
    table.set(pk("c"), br#"{"loc":7}"#.to_vec(), None).unwrap();
    assert_eq!(table.view(|tx| tx.index_len("loc")).unwrap(), 2);

    let target = Rect::point(vec![4.0, 4.0]).unwrap();
    let found = table.view(|tx| {
        let mut out = Vec::new();
        tx.nearby("loc", &target, |k, _, _| {
            out.push(k.clone());
            true
        })
        .unwrap();
        out
    });
    assert_eq!(found, vec![pk("b"), pk("a")]);
}

#[test]
fn test_ordered_scans_on_spatial_index_are_empty() {
    let table = fleet(TableConfig::default());
    assert!(ascend_keys(&table, "fleet").is_empty());
    let none = table.view(|tx| {
        collect(|v| tx.descend_less_or_equal("fleet", Key::string("z"), v).unwrap())
    });
    assert!(none.is_empty());
}
