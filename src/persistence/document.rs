//! Portable export/import document:
//! `{ "money": n, "levels": { name: level }, "timestamp": "...Z", "version": "1.0.0" }`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::ledger::{currency_from_f64, Ledger};

pub const DOCUMENT_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid import document: input is empty")]
    Empty,
    #[error("invalid import document: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid import document: neither money nor levels present")]
    NoUsableFields,
    #[error("failed to serialize export document: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub money: u64,
    pub levels: BTreeMap<String, u32>,
    pub timestamp: String,
    pub version: String,
}

/// Lenient shape accepted on import; every field is optional and values are validated later.
#[derive(Debug, Default, Deserialize)]
struct ImportDocument {
    #[serde(default)]
    money: Option<Value>,
    #[serde(default)]
    levels: Option<Map<String, Value>>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    /// Catalog names whose level was set.
    pub applied: Vec<String>,
    /// Names not in the catalog.
    pub ignored: Vec<String>,
    /// Currency after import, when the document carried a usable amount.
    pub money: Option<u64>,
    pub exported_at: Option<String>,
    pub version: Option<String>,
}

pub fn export_document(ledger: &Ledger) -> ExportDocument {
    ExportDocument {
        money: ledger.available(),
        levels: ledger
            .levels()
            .map(|(name, level)| (name.to_string(), level))
            .collect(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: DOCUMENT_VERSION.to_string(),
    }
}

pub fn export_json(ledger: &Ledger) -> Result<String, DocumentError> {
    serde_json::to_string_pretty(&export_document(ledger)).map_err(DocumentError::Serialize)
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_import(raw: &str) -> Result<ImportDocument, DocumentError> {
    if raw.trim().is_empty() {
        return Err(DocumentError::Empty);
    }
    let doc: ImportDocument = serde_json::from_str(raw).map_err(DocumentError::Parse)?;
    if doc.money.is_none() && doc.levels.is_none() {
        return Err(DocumentError::NoUsableFields);
    }
    Ok(doc)
}

/// Replace levels and currency from an exported document. Nothing changes unless the whole
/// document parses. Currency is set directly, no purchase or refund is applied.
pub fn import_document(ledger: &mut Ledger, raw: &str) -> Result<ImportReport, DocumentError> {
    let doc = parse_import(raw)?;

    let mut applied = Vec::new();
    let mut ignored = Vec::new();
    if let Some(levels) = &doc.levels {
        let (known, unknown): (Vec<_>, Vec<_>) = levels
            .iter()
            .partition(|(name, _)| ledger.catalog().contains(name));
        ignored = unknown.into_iter().map(|(name, _)| name.clone()).collect();
        applied = ledger.assign_levels(
            known
                .into_iter()
                .map(|(name, value)| (name.as_str(), numeric(value).unwrap_or(0.0))),
        );
    }

    let money = doc.money.as_ref().and_then(numeric).map(currency_from_f64);
    if let Some(amount) = money {
        ledger.set_currency(amount);
    }
    ledger.clear_ignored();

    let exported_at = doc
        .timestamp
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true));
    let version = doc.version.as_ref().and_then(Value::as_str).map(str::to_string);

    if !ignored.is_empty() {
        debug!(?ignored, "import skipped unknown upgrades");
    }
    info!(applied = applied.len(), ignored = ignored.len(), "imported ledger document");

    Ok(ImportReport {
        applied,
        ignored,
        money,
        exported_at,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;

    #[test]
    fn export_lists_every_upgrade_in_name_order() {
        let mut ledger = Ledger::with_currency(builtin_catalog(), 321);
        ledger.assign_levels([("Bubbles", 4.0)]);
        let doc = export_document(&ledger);
        assert_eq!(doc.money, 321);
        assert_eq!(doc.version, "1.0.0");
        assert_eq!(doc.levels.len(), 9);
        assert_eq!(doc.levels["Bubbles"], 4);
        assert_eq!(doc.levels.keys().next().map(String::as_str), Some("Bubble Bonanza"));
        assert!(doc.timestamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&doc.timestamp).is_ok());
    }

    #[test]
    fn rejected_documents_leave_ledger_untouched() {
        let mut ledger = Ledger::with_currency(builtin_catalog(), 5);
        ledger.assign_levels([("Bubbles", 2.0)]);
        assert!(matches!(import_document(&mut ledger, "  "), Err(DocumentError::Empty)));
        assert!(matches!(import_document(&mut ledger, "{oops"), Err(DocumentError::Parse(_))));
        assert!(matches!(
            import_document(&mut ledger, r#"{"version":"1.0.0"}"#),
            Err(DocumentError::NoUsableFields)
        ));
        assert_eq!(ledger.level("Bubbles"), Some(2));
        assert_eq!(ledger.available(), 5);
    }

    #[test]
    fn import_clamps_reports_unknown_and_clears_ignored() {
        let mut ledger = Ledger::with_currency(builtin_catalog(), 5);
        ledger.ignore("Bubbles").unwrap();
        let report = import_document(
            &mut ledger,
            r#"{"money": 1500.7, "levels": {"Golden Bubbles": 99, "Ghost": 1, "Bubbles": 3.6},
                "timestamp": "not a date"}"#,
        )
        .unwrap();

        assert_eq!(report.applied, vec!["Golden Bubbles".to_string(), "Bubbles".to_string()]);
        assert_eq!(report.ignored, vec!["Ghost".to_string()]);
        assert_eq!(report.money, Some(1500));
        assert_eq!(report.exported_at, None);
        assert_eq!(ledger.level("Golden Bubbles"), Some(20));
        assert_eq!(ledger.level("Bubbles"), Some(3));
        assert_eq!(ledger.available(), 1500);
        assert!(ledger.ignored().is_empty());
    }

    #[test]
    fn money_only_document_keeps_levels() {
        let mut ledger = Ledger::new(builtin_catalog());
        ledger.assign_levels([("Bubbles", 7.0)]);
        let report = import_document(&mut ledger, r#"{"money": -3}"#).unwrap();
        assert_eq!(report.money, Some(0));
        assert_eq!(ledger.level("Bubbles"), Some(7));
    }
}
