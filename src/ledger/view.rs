//! Read-only table view of a ledger, the shape a presentation layer renders.

use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::ledger::cost::{level_cost, total_spent};
use crate::ledger::Ledger;
use crate::optimizer::{recommend, Recommendation, Strategy};

/// Row filters. Summary figures ignore them and always cover the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub hide_max_level: bool,
    #[serde(default)]
    pub affordable_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeRow {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub level: u32,
    pub max_level: u32,
    pub base_cost: f64,
    pub next_cost: u64,
    pub benefit: f64,
    pub benefit_per_cost: f64,
    pub current_output: f64,
    pub total_spent: u64,
    pub is_max_level: bool,
    pub is_recommended: bool,
    pub affordable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub total_levels: u64,
    pub total_spent: u64,
    pub total_output: f64,
    pub available: u64,
    pub strategy: Strategy,
    pub ignored: Vec<String>,
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerView {
    pub rows: Vec<UpgradeRow>,
    pub summary: LedgerSummary,
}

impl TableQuery {
    fn matches_search(&self, row: &UpgradeRow) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        row.name.to_lowercase().contains(&term) || row.description.to_lowercase().contains(&term)
    }

    fn keeps(&self, row: &UpgradeRow) -> bool {
        self.matches_search(row)
            && self.category.map_or(true, |c| c == row.category)
            && !(self.hide_max_level && row.is_max_level)
            && !(self.affordable_only && !row.affordable)
    }
}

impl Ledger {
    pub fn view(&self, query: &TableQuery) -> LedgerView {
        let recommendation = recommend(self, query.affordable_only);
        let recommended = recommendation.as_ref().map(|r| r.upgrade.as_str());

        let mut rows: Vec<UpgradeRow> = self
            .catalog()
            .iter()
            .map(|upgrade| {
                let level = self.level(&upgrade.name).unwrap_or(0);
                let next_cost = level_cost(upgrade, level.saturating_add(1));
                UpgradeRow {
                    name: upgrade.name.clone(),
                    description: upgrade.description.clone(),
                    category: upgrade.category,
                    level,
                    max_level: upgrade.max_level,
                    base_cost: upgrade.base_cost,
                    next_cost,
                    benefit: upgrade.benefit,
                    benefit_per_cost: upgrade.benefit / next_cost as f64,
                    current_output: upgrade.benefit * f64::from(level),
                    total_spent: total_spent(upgrade, level),
                    is_max_level: level >= upgrade.max_level,
                    is_recommended: recommended == Some(upgrade.name.as_str()),
                    affordable: next_cost <= self.available(),
                }
            })
            .filter(|row| query.keeps(row))
            .collect();

        rows.sort_by(|a, b| {
            b.is_recommended
                .cmp(&a.is_recommended)
                .then_with(|| a.name.cmp(&b.name))
        });

        LedgerView {
            rows,
            summary: LedgerSummary {
                total_levels: self.total_levels(),
                total_spent: self.total_spent_all(),
                total_output: self.total_output(),
                available: self.available(),
                strategy: self.strategy(),
                ignored: self.ignored().into_iter().map(str::to_string).collect(),
                recommendation,
            },
        }
    }
}
