//! Monetary rounding.
//!
//! Prices and transaction amounts are carried as `f64` and rounded to two
//! decimals at every point where an amount is produced (transaction totals,
//! discounted prices, forecast outputs). This is the single rounding rule.

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
