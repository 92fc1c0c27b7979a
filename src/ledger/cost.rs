//! Cost curve: `floor(base_cost * 1.15^(level - 1))` per level, refunds at 80 % floored per level.
//! Every aggregate is derived from levels on demand; sums saturate instead of overflowing.

use crate::catalog::Upgrade;

pub const COST_GROWTH: f64 = 1.15;
pub const REFUND_RATE: f64 = 0.8;

/// Price of buying `level` (1-based). Level 0 is free.
pub fn level_cost(upgrade: &Upgrade, level: u32) -> u64 {
    if level == 0 {
        return 0;
    }
    let raw = upgrade.base_cost * COST_GROWTH.powf(f64::from(level - 1));
    // `as` saturates on overflow and maps NaN to 0.
    raw.floor() as u64
}

/// Amount paid back when `level` is sold.
pub fn level_refund(upgrade: &Upgrade, level: u32) -> u64 {
    (level_cost(upgrade, level) as f64 * REFUND_RATE).floor() as u64
}

/// Add per-level amounts until the sum saturates; past that point more levels change nothing.
fn saturating_sum(amounts: impl Iterator<Item = u64>) -> u64 {
    let mut total = 0u64;
    for amount in amounts {
        total = total.saturating_add(amount);
        if total == u64::MAX {
            break;
        }
    }
    total
}

/// Cost of going from `from` to `to` (levels `from+1 ..= to`).
pub fn purchase_cost(upgrade: &Upgrade, from: u32, to: u32) -> u64 {
    if to <= from {
        return 0;
    }
    saturating_sum((from + 1..=to).map(|level| level_cost(upgrade, level)))
}

/// Refund for going down from `from` to `to` (levels `from ..= to+1`, floored individually).
pub fn refund_value(upgrade: &Upgrade, from: u32, to: u32) -> u64 {
    if from <= to {
        return 0;
    }
    saturating_sum((to + 1..=from).rev().map(|level| level_refund(upgrade, level)))
}

pub fn total_spent(upgrade: &Upgrade, level: u32) -> u64 {
    purchase_cost(upgrade, 0, level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;

    fn upgrade(base_cost: f64) -> Upgrade {
        Upgrade {
            name: "A".to_string(),
            base_cost,
            benefit: 0.02,
            max_level: 100,
            description: String::new(),
            category: Category::Damage,
        }
    }

    #[test]
    fn cost_curve_matches_known_values() {
        let a = upgrade(50.0);
        assert_eq!(level_cost(&a, 0), 0);
        assert_eq!(level_cost(&a, 1), 50);
        assert_eq!(level_cost(&a, 2), 57);
        assert_eq!(level_cost(&a, 3), 66);
    }

    #[test]
    fn range_costs_sum_individual_levels() {
        let a = upgrade(50.0);
        assert_eq!(purchase_cost(&a, 0, 3), 50 + 57 + 66);
        assert_eq!(purchase_cost(&a, 1, 3), 57 + 66);
        assert_eq!(purchase_cost(&a, 3, 3), 0);
        assert_eq!(purchase_cost(&a, 3, 1), 0);
        assert_eq!(total_spent(&a, 2), 107);
    }

    #[test]
    fn refunds_floor_per_level_not_on_aggregate() {
        let a = upgrade(50.0);
        // 40 + 45 + 52 = 137, while floor(0.8 * 173) = 138.
        assert_eq!(refund_value(&a, 3, 0), 137);
        assert_eq!(refund_value(&a, 3, 2), 52);
        assert_eq!(refund_value(&a, 0, 0), 0);
    }

    #[test]
    fn huge_levels_saturate() {
        let a = upgrade(1e300);
        assert_eq!(level_cost(&a, 5_000), u64::MAX);
        assert_eq!(purchase_cost(&a, 0, 3), u64::MAX);
    }

    #[test]
    fn unbounded_max_level_sums_stop_at_saturation() {
        let a = Upgrade {
            max_level: u32::MAX,
            ..upgrade(50.0)
        };
        assert_eq!(purchase_cost(&a, 0, u32::MAX), u64::MAX);
        assert_eq!(total_spent(&a, u32::MAX), u64::MAX);
        assert_eq!(refund_value(&a, u32::MAX, 0), u64::MAX);
        assert_eq!(refund_value(&a, 3, 0), 137);
    }
}
