//! Tabular catalog sources: CSV text and spreadsheet workbooks.
//!
//! Columns are located by case-insensitive keywords in the header row, so exported
//! sheets with extra or reordered columns still load:
//!   name        -> header containing "upgrade" or "name" (first match)
//!   base cost   -> "base" and "cost"
//!   benefit     -> "dps" or "benefit"
//!   max level   -> "max" and "level"
//!   description -> "desc"

use std::io::Read;
use std::path::Path;

use calamine::Reader;
use serde::Serialize;

use crate::catalog::{Catalog, CatalogError, CatalogRow, DiscardReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub name: usize,
    pub base_cost: usize,
    pub benefit: Option<usize>,
    pub max_level: Option<usize>,
    pub description: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscardedRow {
    pub line: usize,
    pub reason: DiscardReason,
}

/// Parsed sheet: resolved columns plus every data row with its source line.
#[derive(Debug, Clone)]
pub struct TabularSheet {
    pub columns: ColumnMap,
    pub rows: Vec<(usize, CatalogRow)>,
}

impl TabularSheet {
    fn from_grid<I>(headers: &[String], records: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (usize, Vec<String>)>,
    {
        let columns = resolve_columns(headers)?;
        let rows = records
            .into_iter()
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|(line, cells)| (line, columns.row_from_cells(&cells)))
            .collect();
        Ok(Self { columns, rows })
    }

    /// Rows that validation would drop, with the reason. Used for diagnostics only.
    pub fn discarded(&self) -> Vec<DiscardedRow> {
        self.rows
            .iter()
            .filter_map(|(line, row)| {
                row.clone().into_upgrade().err().map(|reason| DiscardedRow {
                    line: *line,
                    reason,
                })
            })
            .collect()
    }

    pub fn into_catalog(self) -> Result<Catalog, CatalogError> {
        Catalog::from_rows(self.rows.into_iter().map(|(_, row)| row))
    }
}

impl ColumnMap {
    fn row_from_cells(&self, cells: &[String]) -> CatalogRow {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| cells.get(i))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
        };
        CatalogRow {
            name: cell(Some(self.name)).map(str::to_string),
            base_cost: cell(Some(self.base_cost)).map(|c| parse_number(c).unwrap_or(0.0)),
            benefit: cell(self.benefit).and_then(parse_number),
            max_level: cell(self.max_level).and_then(parse_number),
            description: cell(self.description).map(str::to_string),
            category: None,
        }
    }
}

pub fn resolve_columns<S: AsRef<str>>(headers: &[S]) -> Result<ColumnMap, CatalogError> {
    let lowered: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect();
    let find = |pred: &dyn Fn(&str) -> bool| lowered.iter().position(|h| pred(h));

    let name = find(&|h| h.contains("upgrade") || h.contains("name"))
        .ok_or(CatalogError::MissingColumn("name"))?;
    let base_cost = find(&|h| h.contains("base") && h.contains("cost"))
        .ok_or(CatalogError::MissingColumn("base cost"))?;

    Ok(ColumnMap {
        name,
        base_cost,
        benefit: find(&|h| h.contains("dps") || h.contains("benefit")),
        max_level: find(&|h| h.contains("max") && h.contains("level")),
        description: find(&|h| h.contains("desc")),
    })
}

/// Lenient numeric cell parsing: thousands separators are ignored, garbage yields `None`.
fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell.chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_csv<R: Read>(reader: R) -> Result<TabularSheet, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        records.push((line, record.iter().map(str::to_string).collect()));
    }
    TabularSheet::from_grid(&headers, records)
}

pub fn parse_csv_str(text: &str) -> Result<TabularSheet, CatalogError> {
    parse_csv(text.as_bytes())
}

fn cell_str(d: &calamine::Data) -> String {
    match d {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => format!("{}", f),
        calamine::Data::Int(i) => format!("{}", i),
        calamine::Data::Bool(b) => format!("{}", b),
        _ => format!("{:?}", d),
    }
}

/// Read the first worksheet of an `.xlsx`/`.xls`/`.ods` workbook.
pub fn read_workbook(path: impl AsRef<Path>) -> Result<TabularSheet, CatalogError> {
    let mut workbook = calamine::open_workbook_auto(path.as_ref())?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(CatalogError::EmptyCatalog)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_str).collect())
        .ok_or(CatalogError::EmptyCatalog)?;
    let records = rows
        .enumerate()
        .map(|(i, row)| (i + 2, row.iter().map(cell_str).collect()));
    TabularSheet::from_grid(&headers, records)
}
