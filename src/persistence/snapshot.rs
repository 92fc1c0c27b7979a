//! The three snapshot entries written after every mutation and read back at startup:
//! `levels` (JSON object), `currency` (stringified integer), `strategy` (persisted tag).

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::ledger::{currency_from_f64, Ledger};
use crate::optimizer::Strategy;
use crate::persistence::store::{SnapshotStore, StoreError};

pub const LEVELS_KEY: &str = "levels";
pub const CURRENCY_KEY: &str = "currency";
pub const STRATEGY_KEY: &str = "strategy";

/// What could be read back from a store. Each entry is independent; a missing or corrupt
/// entry is `None` and the others still apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub levels: Option<Map<String, Value>>,
    pub currency: Option<u64>,
    pub strategy: Option<Strategy>,
}

fn read_entry(store: &dyn SnapshotStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, %err, "could not read snapshot entry");
            None
        }
    }
}

pub fn load_snapshot(store: &dyn SnapshotStore) -> PersistedState {
    let levels = read_entry(store, LEVELS_KEY).and_then(|raw| {
        serde_json::from_str::<Map<String, Value>>(&raw)
            .map_err(|err| warn!(%err, "ignoring corrupt levels entry"))
            .ok()
    });

    let currency = read_entry(store, CURRENCY_KEY).and_then(|raw| {
        raw.trim()
            .parse::<f64>()
            .map(currency_from_f64)
            .map_err(|err| warn!(%err, raw = %raw.trim(), "ignoring corrupt currency entry"))
            .ok()
    });

    let strategy = read_entry(store, STRATEGY_KEY).map(|raw| {
        raw.parse::<Strategy>().unwrap_or_else(|err| {
            warn!(%err, "unknown persisted strategy, using default");
            Strategy::default()
        })
    });

    PersistedState {
        levels,
        currency,
        strategy,
    }
}

impl PersistedState {
    /// Apply to a ledger. Levels are matched against the catalog and clamped.
    pub fn apply_to(&self, ledger: &mut Ledger) {
        if let Some(levels) = &self.levels {
            ledger.assign_levels(
                levels
                    .iter()
                    .filter_map(|(name, value)| value.as_f64().map(|v| (name.as_str(), v))),
            );
        }
        if let Some(currency) = self.currency {
            ledger.set_currency(currency);
        }
        if let Some(strategy) = self.strategy {
            ledger.set_strategy(strategy);
        }
    }
}

pub fn save_snapshot(store: &mut dyn SnapshotStore, ledger: &Ledger) -> Result<(), StoreError> {
    let levels: BTreeMap<&str, u32> = ledger.levels().collect();
    store.set(LEVELS_KEY, &serde_json::to_string(&levels)?)?;
    store.set(CURRENCY_KEY, &ledger.available().to_string())?;
    store.set(STRATEGY_KEY, ledger.strategy().tag())?;
    Ok(())
}

/// Load whatever the store holds into `ledger`.
pub fn restore_ledger(store: &dyn SnapshotStore, ledger: &mut Ledger) {
    load_snapshot(store).apply_to(ledger);
}
