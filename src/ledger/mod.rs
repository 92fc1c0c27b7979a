//! The upgrade ledger: catalog, owned levels, spendable currency, ranking strategy and the
//! session ignore-list, owned by one caller and mutated only through its methods.
//!
//! Invariants held after every public call:
//! - every catalog name has exactly one level entry, and `0 <= level <= max_level`;
//! - `available` never goes below zero through a ledger transaction;
//! - nothing derived (spent totals, output) is cached, it is recomputed from levels.

pub mod cost;
pub mod transactions;
pub mod view;

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::catalog::{Catalog, Upgrade};
use crate::optimizer::Strategy;

pub use transactions::{Transaction, TransactionKind};
pub use view::{LedgerSummary, LedgerView, TableQuery, UpgradeRow};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("unknown upgrade '{0}'")]
    UnknownUpgrade(String),
    #[error("insufficient funds for {upgrade}: need {required}, have {available}")]
    InsufficientFunds {
        upgrade: String,
        required: u64,
        available: u64,
        /// Level the upgrade stays at; callers showing an optimistic target must revert to it.
        level: u32,
    },
}

/// Convert an externally supplied amount into ledger currency: floored, negatives and NaN to 0.
pub fn currency_from_f64(amount: f64) -> u64 {
    if amount.is_nan() || amount <= 0.0 {
        0
    } else {
        amount.floor() as u64
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    catalog: Catalog,
    levels: HashMap<String, u32>,
    available: u64,
    strategy: Strategy,
    ignored: HashSet<String>,
}

impl Ledger {
    pub fn new(catalog: Catalog) -> Self {
        let levels = catalog.names().map(|name| (name.to_string(), 0)).collect();
        Self {
            catalog,
            levels,
            available: 0,
            strategy: Strategy::default(),
            ignored: HashSet::new(),
        }
    }

    pub fn with_currency(catalog: Catalog, available: u64) -> Self {
        Self {
            available,
            ..Self::new(catalog)
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Swap in a new catalog. Surviving names keep their level (clamped to the new max),
    /// new names start at 0, dropped names lose their entry.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        let mut levels = HashMap::with_capacity(catalog.len());
        for upgrade in &catalog {
            let kept = self.levels.get(&upgrade.name).copied().unwrap_or(0);
            levels.insert(upgrade.name.clone(), kept.min(upgrade.max_level));
        }
        self.ignored.retain(|name| catalog.contains(name));
        self.levels = levels;
        self.catalog = catalog;
    }

    pub(crate) fn upgrade(&self, name: &str) -> Result<&Upgrade, LedgerError> {
        self.catalog
            .get(name)
            .ok_or_else(|| LedgerError::UnknownUpgrade(name.to_string()))
    }

    pub fn level(&self, name: &str) -> Option<u32> {
        self.levels.get(name).copied()
    }

    /// Levels in catalog order.
    pub fn levels(&self) -> impl Iterator<Item = (&str, u32)> {
        self.catalog
            .names()
            .map(|name| (name, self.levels.get(name).copied().unwrap_or(0)))
    }

    pub(crate) fn write_level(&mut self, name: &str, level: u32) {
        if let Some(slot) = self.levels.get_mut(name) {
            *slot = level;
        }
    }

    /// Overwrite levels from an external source (snapshot or import). Unknown names are
    /// skipped, values are floored and clamped to `[0, max_level]`. Returns the applied names.
    pub fn assign_levels<'a, I>(&mut self, entries: I) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut applied = Vec::new();
        for (name, raw) in entries {
            let Some(upgrade) = self.catalog.get(name) else {
                debug!(%name, "ignoring level for unknown upgrade");
                continue;
            };
            let level = if raw.is_nan() || raw <= 0.0 {
                0
            } else {
                raw.floor().min(f64::from(upgrade.max_level)) as u32
            };
            self.write_level(name, level);
            applied.push(name.to_string());
        }
        applied
    }

    pub fn available(&self) -> u64 {
        self.available
    }

    /// External assignment of spendable currency (user input, snapshot, import).
    pub fn set_currency(&mut self, available: u64) {
        self.available = available;
    }

    pub(crate) fn debit(&mut self, amount: u64) {
        self.available -= amount;
    }

    pub(crate) fn credit(&mut self, amount: u64) {
        self.available = self.available.saturating_add(amount);
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn ignore(&mut self, name: &str) -> Result<(), LedgerError> {
        self.upgrade(name)?;
        self.ignored.insert(name.to_string());
        Ok(())
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }

    /// Ignored names in catalog order.
    pub fn ignored(&self) -> Vec<&str> {
        self.catalog
            .names()
            .filter(|name| self.ignored.contains(*name))
            .collect()
    }

    pub fn clear_ignored(&mut self) {
        self.ignored.clear();
    }

    pub fn next_cost(&self, name: &str) -> Option<u64> {
        let upgrade = self.catalog.get(name)?;
        let level = self.level(name)?;
        Some(cost::level_cost(upgrade, level.saturating_add(1)))
    }

    pub fn total_spent(&self, name: &str) -> Option<u64> {
        let upgrade = self.catalog.get(name)?;
        Some(cost::total_spent(upgrade, self.level(name)?))
    }

    pub fn total_spent_all(&self) -> u64 {
        self.catalog.iter().fold(0u64, |acc, upgrade| {
            let level = self.level(&upgrade.name).unwrap_or(0);
            acc.saturating_add(cost::total_spent(upgrade, level))
        })
    }

    pub fn total_levels(&self) -> u64 {
        self.levels().map(|(_, level)| u64::from(level)).sum()
    }

    /// Aggregate output, `Σ benefit * level`, recomputed from scratch on every call.
    pub fn total_output(&self) -> f64 {
        self.catalog
            .iter()
            .map(|u| u.benefit * f64::from(self.level(&u.name).unwrap_or(0)))
            .sum()
    }

    /// Aggregate output if `name` had one more level.
    pub fn output_after_next_level(&self, name: &str) -> Option<f64> {
        let upgrade = self.catalog.get(name)?;
        Some(self.total_output() + upgrade.benefit)
    }
}
