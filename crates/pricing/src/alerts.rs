//! Expiry alert report over a product's batches.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shelfpulse_ledger::{Batch, BatchId, ExpiryStatus};

/// One batch approaching (or past) its expiry date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryAlert {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub days_left: i64,
    pub quantity: i64,
    pub status: ExpiryStatus,
}

impl ExpiryAlert {
    pub fn at_risk(&self) -> bool {
        self.status.at_risk()
    }
}

/// Batches with stock expiring within `horizon_days`, soonest first.
///
/// Classification comes from the shared classifier; exhausted batches are
/// excluded (nothing left to lose).
pub fn expiry_alerts(batches: &[Batch], today: NaiveDate, horizon_days: i64) -> Vec<ExpiryAlert> {
    let cutoff = today + chrono::Duration::days(horizon_days);

    let mut alerts: Vec<ExpiryAlert> = batches
        .iter()
        .filter(|b| b.quantity > 0 && b.expiry_date <= cutoff)
        .map(|b| ExpiryAlert {
            batch_id: b.id,
            batch_number: b.batch_number.clone(),
            expiry_date: b.expiry_date,
            days_left: b.days_left(today),
            quantity: b.quantity,
            status: b.expiry_status(today),
        })
        .collect();

    alerts.sort_by_key(|a| a.expiry_date);
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(quantity: i64, expiry_date: NaiveDate, seq: u32) -> Batch {
        Batch {
            id: BatchId::new(),
            batch_number: format!("BTEST-{seq:02}"),
            quantity,
            cost_price: 10.0,
            manufacture_date: None,
            expiry_date,
            received_seq: seq,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn alerts_are_sorted_by_expiry_and_classified() {
        let today = date(2026, 3, 1);
        let batches = vec![
            batch(5, today + chrono::Days::new(10), 1),
            batch(5, today - chrono::Days::new(2), 2),
            batch(5, today + chrono::Days::new(3), 3),
        ];

        let alerts = expiry_alerts(&batches, today, 365);
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].status, ExpiryStatus::Expired);
        assert_eq!(alerts[1].status, ExpiryStatus::Critical);
        assert_eq!(alerts[2].status, ExpiryStatus::Warning);
        assert!(alerts.windows(2).all(|w| w[0].expiry_date <= w[1].expiry_date));
        assert!(alerts.iter().all(ExpiryAlert::at_risk));
    }

    #[test]
    fn horizon_and_empty_batches_filter_the_report() {
        let today = date(2026, 3, 1);
        let batches = vec![
            batch(5, today + chrono::Days::new(40), 1),
            batch(0, today + chrono::Days::new(2), 2),
            batch(5, today + chrono::Days::new(12), 3),
        ];

        let alerts = expiry_alerts(&batches, today, 15);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].batch_number, "BTEST-03");
    }
}
