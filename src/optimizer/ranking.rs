use serde::Serialize;

use crate::catalog::Upgrade;
use crate::ledger::cost::level_cost;
use crate::ledger::Ledger;
use crate::optimizer::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUpgrade {
    pub upgrade: String,
    pub score: f64,
    pub level: u32,
    pub next_cost: u64,
}

/// The winning candidate with the figures a presentation layer shows next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub upgrade: String,
    pub strategy: Strategy,
    pub score: f64,
    pub current_level: u32,
    pub max_level: u32,
    pub next_cost: u64,
    pub benefit_gain: f64,
    pub benefit_per_cost: f64,
    pub affordable: bool,
    pub output_after: f64,
    /// `None` while the current output is zero.
    pub output_increase_pct: Option<f64>,
}

/// Value of buying level `level + 1` under `strategy`.
pub fn score(strategy: Strategy, upgrade: &Upgrade, level: u32, next_cost: u64) -> f64 {
    let cost = next_cost as f64;
    match strategy {
        Strategy::ValuePerCost => upgrade.benefit / cost,
        Strategy::RawBenefit => upgrade.benefit,
        Strategy::TotalFutureOutput => upgrade.benefit * (f64::from(level) + 1.0),
        Strategy::CheapestFirst => 1.0 / cost,
    }
}

/// All eligible upgrades, best first. Candidates at max level, ignored for the session, or
/// (with `affordable_only`) too expensive are left out, as are NaN scores. Equal scores keep
/// catalog order, so the first one seen wins.
pub fn rank_upgrades(ledger: &Ledger, affordable_only: bool) -> Vec<RankedUpgrade> {
    let strategy = ledger.strategy();
    let mut ranked: Vec<RankedUpgrade> = ledger
        .catalog()
        .iter()
        .filter_map(|upgrade| {
            let level = ledger.level(&upgrade.name)?;
            if level >= upgrade.max_level || ledger.is_ignored(&upgrade.name) {
                return None;
            }
            let next_cost = level_cost(upgrade, level + 1);
            if affordable_only && next_cost > ledger.available() {
                return None;
            }
            let score = score(strategy, upgrade, level, next_cost);
            if score.is_nan() {
                return None;
            }
            Some(RankedUpgrade {
                upgrade: upgrade.name.clone(),
                score,
                level,
                next_cost,
            })
        })
        .collect();

    // Stable sort: ties stay in catalog order.
    ranked.sort_by(|left, right| right.score.total_cmp(&left.score));
    ranked
}

pub fn recommend(ledger: &Ledger, affordable_only: bool) -> Option<Recommendation> {
    let best = rank_upgrades(ledger, affordable_only).into_iter().next()?;
    let upgrade = ledger.catalog().get(&best.upgrade)?;

    let current_output = ledger.total_output();
    let output_after = ledger.output_after_next_level(&best.upgrade)?;
    let output_increase_pct = (current_output > 0.0)
        .then(|| (output_after - current_output) / current_output * 100.0);

    Some(Recommendation {
        strategy: ledger.strategy(),
        score: best.score,
        current_level: best.level,
        max_level: upgrade.max_level,
        next_cost: best.next_cost,
        benefit_gain: upgrade.benefit,
        benefit_per_cost: upgrade.benefit / best.next_cost as f64,
        affordable: best.next_cost <= ledger.available(),
        output_after,
        output_increase_pct,
        upgrade: best.upgrade,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogRow};

    fn row(name: &str, base_cost: f64, benefit: f64, max_level: f64) -> CatalogRow {
        CatalogRow {
            name: Some(name.to_string()),
            base_cost: Some(base_cost),
            benefit: Some(benefit),
            max_level: Some(max_level),
            ..CatalogRow::default()
        }
    }

    fn ledger() -> Ledger {
        let catalog = Catalog::from_rows(vec![
            row("Cheap", 10.0, 0.1, 10.0),
            row("Strong", 1000.0, 5.0, 10.0),
            row("Efficient", 100.0, 2.0, 10.0),
        ])
        .unwrap();
        Ledger::with_currency(catalog, 500)
    }

    #[test]
    fn each_strategy_picks_its_own_winner() {
        let mut l = ledger();
        let pick = |l: &Ledger| recommend(l, false).map(|r| r.upgrade);

        assert_eq!(pick(&l).as_deref(), Some("Efficient"));
        l.set_strategy(Strategy::RawBenefit);
        assert_eq!(pick(&l).as_deref(), Some("Strong"));
        l.set_strategy(Strategy::CheapestFirst);
        assert_eq!(pick(&l).as_deref(), Some("Cheap"));
        l.set_strategy(Strategy::TotalFutureOutput);
        l.assign_levels([("Efficient", 3.0)]);
        // Efficient: 2.0 * 4 = 8.0 beats Strong: 5.0 * 1.
        assert_eq!(pick(&l).as_deref(), Some("Efficient"));
    }

    #[test]
    fn affordability_filter_is_optional() {
        let mut l = ledger();
        l.set_strategy(Strategy::RawBenefit);
        assert_eq!(recommend(&l, true).map(|r| r.upgrade).as_deref(), Some("Efficient"));
        let unaffordable = recommend(&l, false).unwrap();
        assert_eq!(unaffordable.upgrade, "Strong");
        assert!(!unaffordable.affordable);
    }

    #[test]
    fn maxed_and_ignored_upgrades_are_never_ranked() {
        let mut l = ledger();
        l.assign_levels([("Efficient", 10.0)]);
        l.ignore("Strong").unwrap();
        let ranked = rank_upgrades(&l, false);
        assert_eq!(
            ranked.iter().map(|r| r.upgrade.as_str()).collect::<Vec<_>>(),
            vec!["Cheap"]
        );
    }

    #[test]
    fn ties_resolve_to_first_in_catalog_order() {
        let catalog = Catalog::from_rows(vec![
            row("First", 10.0, 1.0, 5.0),
            row("Second", 10.0, 1.0, 5.0),
        ])
        .unwrap();
        let l = Ledger::new(catalog);
        assert_eq!(recommend(&l, false).map(|r| r.upgrade).as_deref(), Some("First"));
    }

    #[test]
    fn zero_over_zero_score_is_skipped() {
        let catalog = Catalog::from_rows(vec![row("Penny", 0.5, 0.0, 5.0)]).unwrap();
        let l = Ledger::new(catalog);
        assert!(recommend(&l, false).is_none());
    }

    #[test]
    fn increase_percentage_needs_existing_output() {
        let mut l = ledger();
        assert_eq!(recommend(&l, false).unwrap().output_increase_pct, None);
        l.assign_levels([("Strong", 1.0)]);
        let rec = recommend(&l, false).unwrap();
        assert_eq!(rec.upgrade, "Efficient");
        assert!((rec.output_increase_pct.unwrap() - 40.0).abs() < 1e-9);
    }
}
