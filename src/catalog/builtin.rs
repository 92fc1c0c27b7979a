//! Static catalog used when no source is configured or the configured one fails to load.

use crate::catalog::{Catalog, Category, Upgrade};

const BUILTIN_UPGRADES: &[(&str, f64, f64, u32, &str, Category)] = &[
    ("Bubbles", 50.0, 0.02, 175, "Increases bubble damage", Category::Damage),
    ("Bubble Breakthrough", 100.0, 0.10, 90, "Significantly increases damage", Category::Damage),
    ("Bubble Boost", 250.0, 0.02, 120, "Increases bubble spawn rate", Category::Utility),
    ("More Bubbles", 2000.0, 1.0, 45, "Increases maximum bubbles on screen", Category::Utility),
    ("Bubble Bonanza", 5000.0, 0.05, 25, "Chance for double bubble spawn", Category::Special),
    ("Golden Bubbles", 10000.0, 0.15, 20, "Increases money from bubbles", Category::Money),
    ("Bubble Speed", 500.0, 0.01, 100, "Increases bubble movement speed", Category::Utility),
    ("Critical Bubbles", 2500.0, 0.25, 50, "Chance for critical hits", Category::Damage),
    ("Money Bubbles", 5000.0, 0.10, 30, "Bubbles drop more money", Category::Money),
];

pub fn builtin_catalog() -> Catalog {
    Catalog::from_upgrades(
        BUILTIN_UPGRADES
            .iter()
            .map(|&(name, base_cost, benefit, max_level, description, category)| Upgrade {
                name: name.to_string(),
                base_cost,
                benefit,
                max_level,
                description: description.to_string(),
                category,
            })
            .collect(),
    )
}
