use std::fs;

use upgrade_ledger::catalog::tabular::parse_csv_str;
use upgrade_ledger::catalog::{
    builtin_catalog, load_catalog, load_catalog_or_builtin, CatalogOrigin, Category,
    DEFAULT_MAX_LEVEL,
};

const SHEET: &str = "\
Upgrade,Base Cost,DPS,Max Level,Description
Bubbles,50,0.02,175,Increases bubble damage
\"Gold Rush\",\"1,000\",0.5,,\"Earn more, faster\"
,10,1,5,no name
Broken,abc,1,5,bad cost
Bubbles,60,0.03,10,replacement
Speedy Timer,20,0.1,8
";

#[test]
fn csv_catalog_keeps_order_and_replaces_duplicates() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("upgrades.csv");
    fs::write(&path, SHEET).expect("write csv");

    let catalog = load_catalog(&path).expect("csv should load");
    let names: Vec<&str> = catalog.names().collect();
    assert_eq!(names, vec!["Bubbles", "Gold Rush", "Speedy Timer"]);

    let bubbles = catalog.get("Bubbles").expect("bubbles");
    assert_eq!(bubbles.base_cost, 60.0);
    assert_eq!(bubbles.max_level, 10);
    assert_eq!(bubbles.description, "replacement");

    let gold = catalog.get("Gold Rush").expect("gold rush");
    assert_eq!(gold.base_cost, 1000.0);
    assert_eq!(gold.max_level, DEFAULT_MAX_LEVEL);
    assert_eq!(gold.category, Category::Money);
    assert_eq!(gold.description, "Earn more, faster");

    let timer = catalog.get("Speedy Timer").expect("short row accepted");
    assert_eq!(timer.category, Category::Utility);
    assert_eq!(timer.description, "");
}

#[test]
fn discarded_rows_are_reported_with_line_numbers() {
    let sheet = parse_csv_str(SHEET).expect("sheet parses");
    let lines: Vec<usize> = sheet.discarded().iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![4, 5]);
}

#[test]
fn headers_are_matched_by_keyword() {
    let sheet = parse_csv_str("desc,max level,name,benefit,base cost\nx,3,Thing,2,10\n")
        .expect("reordered headers resolve");
    assert_eq!(sheet.columns.name, 2);
    assert_eq!(sheet.columns.base_cost, 4);
    assert_eq!(sheet.columns.benefit, Some(3));
    assert_eq!(sheet.columns.max_level, Some(1));
    assert_eq!(sheet.columns.description, Some(0));

    assert!(parse_csv_str("name,price\nA,10\n").is_err());
}

#[test]
fn object_catalogs_load_from_json_and_yaml() {
    let dir = tempfile::tempdir().expect("temp dir");

    let json_path = dir.path().join("upgrades.json");
    fs::write(
        &json_path,
        r#"{
            "Zeta Coins": {"baseCost": 30, "dps": 1.5, "maxLevel": 4},
            "Alpha": {"baseCost": "12", "benefit": 0.3, "category": "special"},
            "Broken": 7,
            "Free": {"baseCost": 0}
        }"#,
    )
    .expect("write json");
    let catalog = load_catalog(&json_path).expect("json should load");
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Zeta Coins", "Alpha"]);
    assert_eq!(catalog.get("Zeta Coins").map(|u| u.category), Some(Category::Money));
    assert_eq!(catalog.get("Alpha").map(|u| u.category), Some(Category::Special));

    let yaml_path = dir.path().join("upgrades.yml");
    fs::write(
        &yaml_path,
        "Bubble Speed:\n  baseCost: 500\n  benefit: 0.01\n  maxLevel: 100\n",
    )
    .expect("write yaml");
    let catalog = load_catalog(&yaml_path).expect("yaml should load");
    assert_eq!(catalog.get("Bubble Speed").map(|u| u.max_level), Some(100));
}

#[test]
fn unusable_source_falls_back_to_builtin() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.csv");
    fs::write(&path, "Upgrade,Base Cost\n,\n").expect("write csv");

    let load = load_catalog_or_builtin(Some(path.as_path()));
    assert_eq!(load.origin, CatalogOrigin::BuiltIn);
    assert_eq!(load.catalog, builtin_catalog());
    assert!(load.notice.is_some());

    let good = dir.path().join("good.csv");
    fs::write(&good, "name,base cost\nOnly,5\n").expect("write csv");
    let load = load_catalog_or_builtin(Some(good.as_path()));
    assert_eq!(load.origin, CatalogOrigin::File(good.clone()));
    assert!(load.notice.is_none());
    assert_eq!(load.catalog.len(), 1);
}
