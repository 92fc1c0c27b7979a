//! Upgrade catalog: the validated, ordered set of purchasable upgrades.

pub mod builtin;
pub mod category;
pub mod loader;
pub mod object;
pub mod tabular;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use builtin::builtin_catalog;
pub use category::Category;
pub use loader::{load_catalog, load_catalog_or_builtin, CatalogLoad, CatalogLoadFailure, CatalogOrigin};

/// Max level assumed when a source omits it or gives something that is not a positive integer.
pub const DEFAULT_MAX_LEVEL: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub name: String,
    pub base_cost: f64,
    pub benefit: f64,
    pub max_level: u32,
    #[serde(default)]
    pub description: String,
    pub category: Category,
}

/// One raw row from any catalog source, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRow {
    pub name: Option<String>,
    pub base_cost: Option<f64>,
    pub benefit: Option<f64>,
    pub max_level: Option<f64>,
    pub description: Option<String>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    MissingName,
    MissingBaseCost,
    NonPositiveBaseCost,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => write!(f, "missing name"),
            Self::MissingBaseCost => write!(f, "missing base cost"),
            Self::NonPositiveBaseCost => write!(f, "base cost is not positive"),
        }
    }
}

impl CatalogRow {
    pub fn into_upgrade(self) -> Result<Upgrade, DiscardReason> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(DiscardReason::MissingName)?;
        let base_cost = self.base_cost.ok_or(DiscardReason::MissingBaseCost)?;
        if !(base_cost.is_finite() && base_cost > 0.0) {
            return Err(DiscardReason::NonPositiveBaseCost);
        }
        let benefit = self
            .benefit
            .filter(|b| b.is_finite())
            .unwrap_or(0.0)
            .max(0.0);
        let category = self
            .category
            .unwrap_or_else(|| Category::from_name(&name));

        Ok(Upgrade {
            max_level: normalize_max_level(self.max_level),
            description: self.description.unwrap_or_default().trim().to_string(),
            name,
            base_cost,
            benefit,
            category,
        })
    }
}

fn normalize_max_level(raw: Option<f64>) -> u32 {
    match raw {
        Some(value) if value.is_finite() && value >= 1.0 => {
            value.floor().min(u32::MAX as f64) as u32
        }
        _ => DEFAULT_MAX_LEVEL,
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog source: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read catalog workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("catalog source has no {0} column")]
    MissingColumn(&'static str),
    #[error("catalog source produced no usable upgrades")]
    EmptyCatalog,
}

/// Ordered mapping name -> upgrade. Iteration follows first-seen source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    upgrades: Vec<Upgrade>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Validate raw rows into a catalog. Malformed rows are skipped; an empty result is an error.
    pub fn from_rows<I>(rows: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = CatalogRow>,
    {
        let mut upgrades = Vec::new();
        for (position, row) in rows.into_iter().enumerate() {
            match row.into_upgrade() {
                Ok(upgrade) => upgrades.push(upgrade),
                Err(reason) => debug!(position, %reason, "discarding catalog row"),
            }
        }
        let catalog = Self::from_upgrades(upgrades);
        if catalog.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        Ok(catalog)
    }

    /// Build from already-validated upgrades. A repeated name replaces the earlier entry in place.
    pub(crate) fn from_upgrades(upgrades: Vec<Upgrade>) -> Self {
        let mut catalog = Self::default();
        for upgrade in upgrades {
            match catalog.index.get(&upgrade.name) {
                Some(&slot) => catalog.upgrades[slot] = upgrade,
                None => {
                    catalog
                        .index
                        .insert(upgrade.name.clone(), catalog.upgrades.len());
                    catalog.upgrades.push(upgrade);
                }
            }
        }
        catalog
    }

    pub fn get(&self, name: &str) -> Option<&Upgrade> {
        self.index.get(name).map(|&slot| &self.upgrades[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Upgrade> {
        self.upgrades.iter()
    }

    pub fn upgrades(&self) -> &[Upgrade] {
        &self.upgrades
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.upgrades.iter().map(|u| u.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.upgrades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upgrades.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Upgrade;
    type IntoIter = std::slice::Iter<'a, Upgrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, base_cost: Option<f64>) -> CatalogRow {
        CatalogRow {
            name: Some(name.to_string()),
            base_cost,
            benefit: Some(0.5),
            ..CatalogRow::default()
        }
    }

    #[test]
    fn rows_without_name_or_positive_cost_are_discarded() {
        let catalog = Catalog::from_rows(vec![
            row("Keep", Some(10.0)),
            row("   ", Some(10.0)),
            row("NoCost", None),
            row("Zero", Some(0.0)),
            row("Negative", Some(-4.0)),
        ])
        .expect("one row survives");

        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Keep"]);
    }

    #[test]
    fn empty_result_is_reported_distinctly() {
        let err = Catalog::from_rows(vec![row("Zero", Some(0.0))]).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyCatalog));
    }

    #[test]
    fn max_level_defaults_when_not_a_positive_integer() {
        let mut r = row("A", Some(5.0));
        assert_eq!(r.clone().into_upgrade().unwrap().max_level, DEFAULT_MAX_LEVEL);
        r.max_level = Some(0.0);
        assert_eq!(r.clone().into_upgrade().unwrap().max_level, DEFAULT_MAX_LEVEL);
        r.max_level = Some(-3.0);
        assert_eq!(r.clone().into_upgrade().unwrap().max_level, DEFAULT_MAX_LEVEL);
        r.max_level = Some(12.7);
        assert_eq!(r.into_upgrade().unwrap().max_level, 12);
    }

    #[test]
    fn duplicate_names_replace_in_place() {
        let mut second = row("A", Some(99.0));
        second.benefit = Some(2.0);
        let catalog =
            Catalog::from_rows(vec![row("A", Some(1.0)), row("B", Some(2.0)), second]).unwrap();

        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(catalog.get("A").map(|u| u.base_cost), Some(99.0));
        assert_eq!(catalog.get("A").map(|u| u.benefit), Some(2.0));
    }

    #[test]
    fn explicit_category_overrides_heuristic() {
        let mut r = row("Bubble Boost", Some(250.0));
        assert_eq!(r.clone().into_upgrade().unwrap().category, Category::Damage);
        r.category = Some(Category::Utility);
        assert_eq!(r.into_upgrade().unwrap().category, Category::Utility);
    }

    #[test]
    fn negative_benefit_clamps_to_zero() {
        let mut r = row("A", Some(5.0));
        r.benefit = Some(-1.0);
        assert_eq!(r.into_upgrade().unwrap().benefit, 0.0);
    }
}
