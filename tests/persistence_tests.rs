use std::fs;

use upgrade_ledger::catalog::builtin_catalog;
use upgrade_ledger::ledger::Ledger;
use upgrade_ledger::optimizer::Strategy;
use upgrade_ledger::persistence::{
    export_document, export_json, import_document, restore_ledger, save_snapshot, DirStore,
    SnapshotStore, CURRENCY_KEY, LEVELS_KEY, STRATEGY_KEY,
};

#[test]
fn snapshot_round_trips_through_a_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = DirStore::new(dir.path().join("state"));

    let mut ledger = Ledger::with_currency(builtin_catalog(), 5_000);
    ledger.buy("Bubbles", 3).expect("affordable");
    ledger.set_strategy(Strategy::TotalFutureOutput);
    save_snapshot(&mut store, &ledger).expect("snapshot saves");

    assert_eq!(
        store.get(CURRENCY_KEY).expect("readable").as_deref(),
        Some(ledger.available().to_string().as_str())
    );
    assert_eq!(
        store.get(STRATEGY_KEY).expect("readable").as_deref(),
        Some("totalDamage")
    );

    let reopened = DirStore::new(dir.path().join("state"));
    let mut restored = Ledger::new(builtin_catalog());
    restore_ledger(&reopened, &mut restored);
    assert_eq!(restored.levels().collect::<Vec<_>>(), ledger.levels().collect::<Vec<_>>());
    assert_eq!(restored.available(), ledger.available());
    assert_eq!(restored.strategy(), Strategy::TotalFutureOutput);
}

#[test]
fn partial_snapshot_restores_what_it_can() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = DirStore::new(dir.path());
    store.set(LEVELS_KEY, r#"{"More Bubbles": 2}"#).expect("write");
    fs::write(dir.path().join("unrelated.txt"), "keep me").expect("write");

    let mut ledger = Ledger::with_currency(builtin_catalog(), 77);
    restore_ledger(&store, &mut ledger);
    assert_eq!(ledger.level("More Bubbles"), Some(2));
    assert_eq!(ledger.available(), 77);
    assert_eq!(ledger.strategy(), Strategy::ValuePerCost);

    store.clear().expect("clear");
    assert_eq!(store.get(LEVELS_KEY).expect("readable"), None);
    assert!(dir.path().join("unrelated.txt").exists());
}

#[test]
fn export_then_import_reproduces_levels_and_money() {
    let mut source = Ledger::with_currency(builtin_catalog(), 20_000);
    source.buy("Critical Bubbles", 2).expect("affordable");
    source.buy("Bubble Speed", 4).expect("affordable");
    let raw = export_json(&source).expect("export serializes");

    let mut target = Ledger::new(builtin_catalog());
    let report = import_document(&mut target, &raw).expect("own export imports");
    assert_eq!(report.applied.len(), 9);
    assert!(report.ignored.is_empty());
    assert_eq!(report.version.as_deref(), Some("1.0.0"));
    assert!(report.exported_at.is_some());
    assert_eq!(target.levels().collect::<Vec<_>>(), source.levels().collect::<Vec<_>>());
    assert_eq!(target.available(), source.available());
}

#[test]
fn import_does_not_charge_currency() {
    let mut ledger = Ledger::with_currency(builtin_catalog(), 10);
    import_document(&mut ledger, r#"{"levels": {"Golden Bubbles": 5}}"#).expect("imports");
    assert_eq!(ledger.level("Golden Bubbles"), Some(5));
    assert_eq!(ledger.available(), 10);
    assert_eq!(export_document(&ledger).levels["Golden Bubbles"], 5);
}
