pub mod ranking;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use ranking::{rank_upgrades, recommend, score, RankedUpgrade, Recommendation};

/// Ranking formula used to pick the next purchase. Serialized with the short tags that the
/// persisted snapshot stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// `benefit / next_cost`
    #[default]
    #[serde(rename = "dpsPerCost")]
    ValuePerCost,
    /// `benefit`
    #[serde(rename = "dps")]
    RawBenefit,
    /// `benefit * (level + 1)`
    #[serde(rename = "totalDamage")]
    TotalFutureOutput,
    /// `1 / next_cost`
    #[serde(rename = "cost")]
    CheapestFirst,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::ValuePerCost,
        Strategy::RawBenefit,
        Strategy::TotalFutureOutput,
        Strategy::CheapestFirst,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::ValuePerCost => "dpsPerCost",
            Self::RawBenefit => "dps",
            Self::TotalFutureOutput => "totalDamage",
            Self::CheapestFirst => "cost",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ValuePerCost => "value-per-cost",
            Self::RawBenefit => "raw-benefit",
            Self::TotalFutureOutput => "total-future-output",
            Self::CheapestFirst => "cheapest-first",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown strategy '{}' (expected one of dpsPerCost, dps, totalDamage, cost)",
            self.0
        )
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    /// Accepts the persisted tags and the descriptive labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Strategy::ALL
            .into_iter()
            .find(|strategy| {
                strategy.tag().eq_ignore_ascii_case(trimmed)
                    || strategy.label().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_labels() {
        assert_eq!("dpsPerCost".parse(), Ok(Strategy::ValuePerCost));
        assert_eq!("totaldamage".parse(), Ok(Strategy::TotalFutureOutput));
        assert_eq!("cheapest-first".parse(), Ok(Strategy::CheapestFirst));
        assert!("profit".parse::<Strategy>().is_err());
    }

    #[test]
    fn serializes_to_persisted_tag() {
        assert_eq!(
            serde_json::to_string(&Strategy::RawBenefit).unwrap(),
            "\"dps\""
        );
        assert_eq!(Strategy::default(), Strategy::ValuePerCost);
    }
}
