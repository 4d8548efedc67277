//! Expiry-state classification.
//!
//! One implementation, applied everywhere expiry state is reported (alerts,
//! discounts, dashboards). The critical band is strictly `< 7` days; keeping
//! a single classifier is what prevents `< 7` vs `<= 7` drift between call
//! sites.

use serde::{Deserialize, Serialize};

/// Expiry state of a batch, derived from days until its expiry date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    Expired,
    Critical,
    Warning,
    Fresh,
}

impl ExpiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "expired",
            ExpiryStatus::Critical => "critical",
            ExpiryStatus::Warning => "warning",
            ExpiryStatus::Fresh => "fresh",
        }
    }

    /// Everything short of fresh counts as at-risk for alerting.
    pub fn at_risk(&self) -> bool {
        !matches!(self, ExpiryStatus::Fresh)
    }
}

impl core::fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify days-until-expiry into an expiry state.
///
/// Pure and total:
/// - `days_left <= 0` → expired
/// - `0 < days_left < 7` → critical
/// - `7 <= days_left <= 15` → warning
/// - `days_left > 15` → fresh
pub fn classify(days_left: i64) -> ExpiryStatus {
    if days_left <= 0 {
        ExpiryStatus::Expired
    } else if days_left < 7 {
        ExpiryStatus::Critical
    } else if days_left <= 15 {
        ExpiryStatus::Warning
    } else {
        ExpiryStatus::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(-3), ExpiryStatus::Expired);
        assert_eq!(classify(0), ExpiryStatus::Expired);
        assert_eq!(classify(1), ExpiryStatus::Critical);
        assert_eq!(classify(6), ExpiryStatus::Critical);
        assert_eq!(classify(7), ExpiryStatus::Warning);
        assert_eq!(classify(15), ExpiryStatus::Warning);
        assert_eq!(classify(16), ExpiryStatus::Fresh);
        assert_eq!(classify(365), ExpiryStatus::Fresh);
    }

    #[test]
    fn at_risk_excludes_only_fresh() {
        assert!(ExpiryStatus::Expired.at_risk());
        assert!(ExpiryStatus::Critical.at_risk());
        assert!(ExpiryStatus::Warning.at_risk());
        assert!(!ExpiryStatus::Fresh.at_risk());
    }
}
