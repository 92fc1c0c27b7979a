//! Category tags derived from upgrade names.
//!
//! Rules are checked in order and the first keyword hit wins. Anything unmatched is
//! treated as a damage upgrade. Categories only drive filtering and display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Damage,
    Money,
    Utility,
    Special,
}

const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (Category::Damage, &["bubble", "damage"]),
    (Category::Money, &["money", "gold", "coin"]),
    (Category::Utility, &["speed", "rate", "time"]),
    (Category::Special, &["special", "bonus", "chance"]),
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Damage => "damage",
            Self::Money => "money",
            Self::Utility => "utility",
            Self::Special => "special",
        }
    }

    /// Derive a category from an upgrade name using the ordered keyword rules.
    pub fn from_name(name: &str) -> Self {
        let lowered = name.to_lowercase();
        CATEGORY_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(category, _)| *category)
            .unwrap_or_default()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "damage" => Ok(Self::Damage),
            "money" => Ok(Self::Money),
            "utility" => Ok(Self::Utility),
            "special" => Ok(Self::Special),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        // "Money Bubbles" hits the damage rule before the money rule.
        assert_eq!(Category::from_name("Money Bubbles"), Category::Damage);
        assert_eq!(Category::from_name("Gold Rush"), Category::Money);
        assert_eq!(Category::from_name("Spawn Rate"), Category::Utility);
        assert_eq!(Category::from_name("Lucky Chance"), Category::Special);
    }

    #[test]
    fn unmatched_names_default_to_damage() {
        assert_eq!(Category::from_name("Mystery Box"), Category::Damage);
        assert_eq!(Category::from_name(""), Category::Damage);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(Category::from_name("COIN MAGNET"), Category::Money);
        assert_eq!(Category::from_name("TimeWarp"), Category::Utility);
    }

    #[test]
    fn parses_tags_loosely() {
        assert_eq!(" Special ".parse::<Category>(), Ok(Category::Special));
        assert!("shiny".parse::<Category>().is_err());
    }
}
