//! Buy / sell / set-level transactions. Each one is applied fully or rejected with no change.

use serde::Serialize;
use tracing::debug;

use crate::ledger::cost::{purchase_cost, refund_value};
use crate::ledger::{Ledger, LedgerError};
use crate::optimizer::recommend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Refund,
    Unchanged,
}

/// Outcome of a successful transaction. `amount` is what was paid (purchase) or returned
/// (refund); `available` is the currency left afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub upgrade: String,
    pub kind: TransactionKind,
    pub from_level: u32,
    pub to_level: u32,
    pub amount: u64,
    pub available: u64,
}

impl Transaction {
    pub fn levels_changed(&self) -> u32 {
        self.from_level.abs_diff(self.to_level)
    }
}

impl Ledger {
    fn unchanged(&self, name: &str, level: u32) -> Transaction {
        Transaction {
            upgrade: name.to_string(),
            kind: TransactionKind::Unchanged,
            from_level: level,
            to_level: level,
            amount: 0,
            available: self.available(),
        }
    }

    fn purchase_to(&mut self, name: &str, from: u32, to: u32) -> Result<Transaction, LedgerError> {
        let upgrade = self.upgrade(name)?;
        let required = purchase_cost(upgrade, from, to);
        let available = self.available();
        if required > available {
            debug!(%name, required, available, "purchase rejected");
            return Err(LedgerError::InsufficientFunds {
                upgrade: name.to_string(),
                required,
                available,
                level: from,
            });
        }
        self.write_level(name, to);
        self.debit(required);
        debug!(%name, from, to, cost = required, "purchased levels");
        Ok(Transaction {
            upgrade: name.to_string(),
            kind: TransactionKind::Purchase,
            from_level: from,
            to_level: to,
            amount: required,
            available: self.available(),
        })
    }

    fn refund_to(&mut self, name: &str, from: u32, to: u32) -> Result<Transaction, LedgerError> {
        let refund = refund_value(self.upgrade(name)?, from, to);
        self.write_level(name, to);
        self.credit(refund);
        debug!(%name, from, to, refund, "refunded levels");
        Ok(Transaction {
            upgrade: name.to_string(),
            kind: TransactionKind::Refund,
            from_level: from,
            to_level: to,
            amount: refund,
            available: self.available(),
        })
    }

    /// Buy up to `count` levels. The count is clamped to the room left below `max_level`;
    /// the whole clamped batch is rejected if it costs more than the available currency.
    pub fn buy(&mut self, name: &str, count: u32) -> Result<Transaction, LedgerError> {
        let max_level = self.upgrade(name)?.max_level;
        let current = self.level(name).unwrap_or(0);
        let count = count.min(max_level.saturating_sub(current));
        if count == 0 {
            return Ok(self.unchanged(name, current));
        }
        self.purchase_to(name, current, current + count)
    }

    /// Sell up to `count` levels at the refund rate. Selling at level 0 is a no-op.
    pub fn sell(&mut self, name: &str, count: u32) -> Result<Transaction, LedgerError> {
        self.upgrade(name)?;
        let current = self.level(name).unwrap_or(0);
        let count = count.min(current);
        if count == 0 {
            return Ok(self.unchanged(name, current));
        }
        self.refund_to(name, current, current - count)
    }

    /// Move to `target` (clamped to `[0, max_level]`), buying or refunding the difference.
    pub fn set_level(&mut self, name: &str, target: i64) -> Result<Transaction, LedgerError> {
        let max_level = self.upgrade(name)?.max_level;
        let target = target.clamp(0, i64::from(max_level)) as u32;
        let current = self.level(name).unwrap_or(0);
        match target.cmp(&current) {
            std::cmp::Ordering::Greater => self.purchase_to(name, current, target),
            std::cmp::Ordering::Less => self.refund_to(name, current, target),
            std::cmp::Ordering::Equal => Ok(self.unchanged(name, current)),
        }
    }

    /// The "MAX" quick action: go straight to `max_level`, all or nothing.
    pub fn max_out(&mut self, name: &str) -> Result<Transaction, LedgerError> {
        let max_level = self.upgrade(name)?.max_level;
        self.set_level(name, i64::from(max_level))
    }

    /// Put every upgrade back to level 0 without refunding, and forget ignored upgrades.
    pub fn reset_levels(&mut self) {
        let names: Vec<String> = self.catalog().names().map(str::to_string).collect();
        for name in names {
            self.write_level(&name, 0);
        }
        self.clear_ignored();
        debug!("levels reset");
    }

    /// Buy one level of the current recommendation. `Ok(None)` when nothing is recommended.
    pub fn buy_recommended(
        &mut self,
        affordable_only: bool,
    ) -> Result<Option<Transaction>, LedgerError> {
        match recommend(self, affordable_only) {
            Some(rec) => self.buy(&rec.upgrade, 1).map(Some),
            None => Ok(None),
        }
    }

    /// Exclude the current recommendation for the rest of the session; returns its name.
    pub fn ignore_recommended(&mut self, affordable_only: bool) -> Option<String> {
        let rec = recommend(self, affordable_only)?;
        self.ignored.insert(rec.upgrade.clone());
        Some(rec.upgrade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogRow};

    fn ledger(available: u64) -> Ledger {
        let catalog = Catalog::from_rows(vec![CatalogRow {
            name: Some("A".into()),
            base_cost: Some(50.0),
            benefit: Some(0.02),
            max_level: Some(5.0),
            ..CatalogRow::default()
        }])
        .unwrap();
        Ledger::with_currency(catalog, available)
    }

    #[test]
    fn buy_clamps_to_room_left() {
        let mut l = ledger(10_000);
        let tx = l.buy("A", 50).unwrap();
        assert_eq!((tx.from_level, tx.to_level), (0, 5));
        assert_eq!(tx.levels_changed(), 5);
        let again = l.buy("A", 1).unwrap();
        assert_eq!(again.kind, TransactionKind::Unchanged);
        assert_eq!(l.available(), tx.available);
    }

    #[test]
    fn rejected_buy_leaves_state_untouched() {
        let mut l = ledger(100);
        l.buy("A", 1).unwrap();
        let err = l.buy("A", 1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                upgrade: "A".into(),
                required: 57,
                available: 50,
                level: 1,
            }
        );
        assert_eq!(l.level("A"), Some(1));
        assert_eq!(l.available(), 50);
    }

    #[test]
    fn sell_clamps_and_refunds_per_level() {
        let mut l = ledger(1_000);
        l.buy("A", 3).unwrap();
        let before = l.available();
        let tx = l.sell("A", 10).unwrap();
        assert_eq!((tx.from_level, tx.to_level, tx.amount), (3, 0, 137));
        assert_eq!(l.available(), before + 137);
        assert_eq!(l.sell("A", 1).unwrap().kind, TransactionKind::Unchanged);
    }

    #[test]
    fn set_level_clamps_target_and_reports_revert_level() {
        let mut l = ledger(60);
        let err = l.set_level("A", 99).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { level: 0, .. }));

        let tx = l.set_level("A", 1).unwrap();
        assert_eq!(tx.kind, TransactionKind::Purchase);
        let down = l.set_level("A", -7).unwrap();
        assert_eq!((down.kind, down.to_level, down.amount), (TransactionKind::Refund, 0, 40));
    }

    #[test]
    fn max_out_is_all_or_nothing() {
        let mut l = ledger(100);
        assert!(l.max_out("A").is_err());
        assert_eq!(l.level("A"), Some(0));
    }

    #[test]
    fn unknown_upgrade_is_rejected_everywhere() {
        let mut l = ledger(100);
        for result in [l.clone().buy("Z", 1), l.clone().sell("Z", 1), l.set_level("Z", 1)] {
            assert_eq!(result, Err(LedgerError::UnknownUpgrade("Z".into())));
        }
    }

    #[test]
    fn reset_zeroes_levels_without_refund() {
        let mut l = ledger(1_000);
        l.buy("A", 2).unwrap();
        let available = l.available();
        l.reset_levels();
        assert_eq!(l.level("A"), Some(0));
        assert_eq!(l.available(), available);
    }
}
