//! Seasonal heuristic fallback for untrained categories.
//!
//! An ordered rule table: the first rule whose keyword matches the category
//! name (case-insensitive substring) supplies the monthly multiplier. No
//! match means flat demand. Rules are data, so they are testable without
//! touching the regression path.

use shelfpulse_core::round2;

/// Demand baseline the multipliers scale.
pub const BASE_DEMAND: f64 = 50.0;

/// Fixed confidence for heuristic predictions (medium).
pub const HEURISTIC_CONFIDENCE: f64 = 0.5;

/// One seasonal pattern: keyword predicate + month multiplier.
pub struct SeasonalRule {
    pub name: &'static str,
    keywords: &'static [&'static str],
    multiplier: fn(u32) -> f64,
}

impl SeasonalRule {
    pub fn matches(&self, category: &str) -> bool {
        let lowered = category.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k))
    }

    pub fn multiplier(&self, month: u32) -> f64 {
        (self.multiplier)(month)
    }
}

fn beverages(month: u32) -> f64 {
    match month {
        4..=7 => 1.8,
        12 | 1 | 2 => 0.6,
        _ => 1.0,
    }
}

fn frozen(month: u32) -> f64 {
    match month {
        4..=8 => 2.0,
        _ => 0.5,
    }
}

fn stationery(month: u32) -> f64 {
    match month {
        3 | 4 | 11 | 12 => 1.5,
        6 => 1.3,
        _ => 1.0,
    }
}

fn snacks(month: u32) -> f64 {
    match month {
        10..=12 => 1.2,
        _ => 1.0,
    }
}

/// Evaluated in priority order; first match wins.
pub const RULES: &[SeasonalRule] = &[
    SeasonalRule {
        name: "beverages",
        keywords: &["drink", "beverage", "juice", "cold"],
        multiplier: beverages,
    },
    SeasonalRule {
        name: "frozen",
        keywords: &["cream", "frozen"],
        multiplier: frozen,
    },
    SeasonalRule {
        name: "stationery",
        keywords: &["stationery", "book", "pen"],
        multiplier: stationery,
    },
    SeasonalRule {
        name: "snacks",
        keywords: &["snack", "food"],
        multiplier: snacks,
    },
];

/// Monthly multiplier for a category name; 1.0 when no rule matches.
pub fn multiplier_for(category: &str, month: u32) -> f64 {
    RULES
        .iter()
        .find(|rule| rule.matches(category))
        .map(|rule| rule.multiplier(month))
        .unwrap_or(1.0)
}

/// Heuristic demand estimate for an untrained category.
pub fn heuristic_demand(category: &str, month: u32) -> f64 {
    round2(BASE_DEMAND * multiplier_for(category, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beverages_peak_in_summer_and_dip_in_winter() {
        assert_eq!(heuristic_demand("Soft Drinks", 5), 90.0);
        assert_eq!(heuristic_demand("Soft Drinks", 1), 30.0);
        assert_eq!(heuristic_demand("Soft Drinks", 9), 50.0);
    }

    #[test]
    fn frozen_goods_double_in_summer_and_halve_otherwise() {
        assert_eq!(heuristic_demand("Ice Cream", 6), 100.0);
        assert_eq!(heuristic_demand("Frozen Foods", 2), 25.0);
    }

    #[test]
    fn stationery_peaks_around_exams() {
        assert_eq!(heuristic_demand("Stationery", 11), 75.0);
        assert_eq!(heuristic_demand("Notebooks", 6), 65.0);
        assert_eq!(heuristic_demand("Pens", 8), 50.0);
    }

    #[test]
    fn snacks_rise_in_the_festive_quarter() {
        assert_eq!(heuristic_demand("Snack Foods", 11), 60.0);
        assert_eq!(heuristic_demand("Snack Foods", 5), 50.0);
    }

    #[test]
    fn matching_is_case_insensitive_and_ordered() {
        // "Cold" hits the beverages rule before anything else.
        assert_eq!(multiplier_for("COLD Juices", 5), 1.8);
        // "Frozen Drinks" matches beverages first (rule order, not best fit).
        assert_eq!(multiplier_for("Frozen Drinks", 2), 0.6);
    }

    #[test]
    fn unmatched_categories_are_flat() {
        for month in 1..=12 {
            assert_eq!(heuristic_demand("Household", month), BASE_DEMAND);
        }
    }
}
