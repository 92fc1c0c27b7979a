//! Inspect a tabular catalog source: print the resolved columns, every row that would load,
//! and the rows validation would drop.
//! Usage: cargo run --bin inspect_catalog -- path/to/upgrades.csv|.xlsx

use std::fs::File;
use std::path::Path;

use upgrade_ledger::catalog::tabular::{parse_csv, read_workbook};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("Usage: inspect_catalog <path-to.csv|.xlsx>")?;
    let path = Path::new(&path);
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    let is_workbook = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls" | "ods"))
        .unwrap_or(false);
    let sheet = if is_workbook {
        read_workbook(path)?
    } else {
        parse_csv(File::open(path)?)?
    };

    let c = &sheet.columns;
    println!(
        "Columns: name={} base_cost={} benefit={:?} max_level={:?} description={:?}",
        c.name, c.base_cost, c.benefit, c.max_level, c.description
    );

    let discarded = sheet.discarded();
    println!("\nRows ({}):", sheet.rows.len());
    for (line, row) in &sheet.rows {
        if discarded.iter().any(|d| d.line == *line) {
            continue;
        }
        if let Ok(upgrade) = row.clone().into_upgrade() {
            println!(
                "  {}: {} | base {} | benefit {} | max {} | {}",
                line, upgrade.name, upgrade.base_cost, upgrade.benefit, upgrade.max_level, upgrade.category
            );
        }
    }

    println!("\nDiscarded ({}):", discarded.len());
    for d in &discarded {
        println!("  {}: {}", d.line, d.reason);
    }
    Ok(())
}
