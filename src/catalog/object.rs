//! Object-form catalogs: `{ "<name>": { "baseCost", "benefit" | "dps", "maxLevel", "description" } }`
//! in JSON or YAML. Key order is kept so ranking ties resolve the same way as the source.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::{Catalog, CatalogError, CatalogRow, Category};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectEntry {
    #[serde(default, alias = "base_cost")]
    base_cost: Option<NumberLike>,
    #[serde(default, alias = "dps")]
    benefit: Option<NumberLike>,
    #[serde(default, alias = "max_level")]
    max_level: Option<NumberLike>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl ObjectEntry {
    fn into_row(self, name: String) -> CatalogRow {
        CatalogRow {
            name: Some(name),
            base_cost: self.base_cost.as_ref().map(|n| n.value().unwrap_or(0.0)),
            benefit: self.benefit.as_ref().and_then(NumberLike::value),
            max_level: self.max_level.as_ref().and_then(NumberLike::value),
            description: self.description,
            category: self.category.and_then(|c| c.parse::<Category>().ok()),
        }
    }
}

fn rows_from_map(map: Map<String, Value>) -> Vec<CatalogRow> {
    map.into_iter()
        .filter_map(|(name, value)| match serde_json::from_value::<ObjectEntry>(value) {
            Ok(entry) => Some(entry.into_row(name)),
            Err(err) => {
                debug!(%name, %err, "skipping malformed catalog entry");
                None
            }
        })
        .collect()
}

pub fn parse_object_json(raw: &str) -> Result<Catalog, CatalogError> {
    let map: Map<String, Value> = serde_json::from_str(raw)?;
    Catalog::from_rows(rows_from_map(map))
}

pub fn parse_object_yaml(raw: &str) -> Result<Catalog, CatalogError> {
    let map: Map<String, Value> = serde_yaml::from_str(raw)?;
    Catalog::from_rows(rows_from_map(map))
}
