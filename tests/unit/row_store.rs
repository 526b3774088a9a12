//! Row store persistence and blacklist classification

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use test_log::test;

use crate::common::{fixtures::write_file, logging};
use stock_sifter::blacklist::{boost_failures, RowStore};
use stock_sifter::models::{BlacklistPolicy, SymbolRecord};

fn set(symbols: &[&str]) -> BTreeSet<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_outcomes_round_trip_through_file() {
    logging::init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("symbol_data.csv");

    let mut store = RowStore::load_or_create(&path).unwrap();
    store.apply_outcomes(&set(&["A"]), &set(&["B"]));
    store.persist(&path).unwrap();

    let mut store = RowStore::load(&path).unwrap();
    assert_eq!(store.records(), &[SymbolRecord::new("A", 1, 0), SymbolRecord::new("B", 0, 1)]);

    store.apply_outcomes(&set(&["A"]), &set(&[]));
    store.persist(&path).unwrap();

    let store = RowStore::load(&path).unwrap();
    logging::log_test_data("Reloaded records", &store.records());
    assert_eq!(store.record("A"), Some(&SymbolRecord::new("A", 2, 0)));
    assert_eq!(store.record("B"), Some(&SymbolRecord::new("B", 0, 1)));
}

#[test]
fn test_counts_never_decrease() {
    let mut store = RowStore::new(vec![SymbolRecord::new("A", 4, 7), SymbolRecord::new("B", 1, 0)]);
    let before = store.clone();

    store.apply_outcomes(&set(&["B", "C"]), &set(&["A", "D"]));

    for old in before.records() {
        let new = store.record(&old.symbol).unwrap();
        assert!(new.successes >= old.successes);
        assert!(new.failures >= old.failures);
    }
    assert_eq!(store.len(), 4);
}

#[test]
fn test_blacklist_from_persisted_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "symbol_data.csv",
        "symbol,successes,failures\nWEAK,1,5\nOKAY,1,3\nNEW,0,0\n",
    );

    let store = RowStore::load(&path).unwrap();
    let blacklist = store.blacklist(&BlacklistPolicy {
        minimum_failures: 3,
        ratio_threshold: 0.2,
    });

    assert_eq!(blacklist.len(), 1);
    assert!(blacklist.contains("WEAK"));
}

#[test]
fn test_boost_then_blacklist() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "symbol_data.csv", "symbol,successes,failures\nSLIP,1,3\n");

    assert!(RowStore::load(&path).unwrap().compute_blacklist(3, 0.2).is_empty());

    boost_failures(&path, 2, 3).unwrap();

    let store = RowStore::load(&path).unwrap();
    assert_eq!(store.record("SLIP"), Some(&SymbolRecord::new("SLIP", 1, 6)));
    assert!(store.compute_blacklist(3, 0.2).contains("SLIP"));
}
