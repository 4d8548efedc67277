//! Pulse engine: expiry-driven dynamic discounting.
//!
//! A product with any batch inside the critical expiry band (stock present,
//! strictly under 7 days left) sells at a flat 20% off its list price.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shelfpulse_core::round2;
use shelfpulse_ledger::{classify, Batch, BatchId, ExpiryStatus};

/// Flat discount applied while any critical-window batch has stock.
pub const PULSE_DISCOUNT_PCT: u32 = 20;

/// A batch that puts the product into the discount window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifyingBatch {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub days_left: i64,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
}

/// Outcome of a discount computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountQuote {
    pub has_discount: bool,
    pub discount_pct: u32,
    pub original_price: f64,
    pub discounted_price: f64,
    pub qualifying_batches: Vec<QualifyingBatch>,
    pub reason: Option<String>,
}

/// Derive the pulse discount for a product from its current batches.
///
/// Pure computation: qualifying batches are those with `quantity > 0` whose
/// days-left classify as critical. Any qualifier puts the product at
/// `PULSE_DISCOUNT_PCT` off, with the price rounded to 2 decimals.
pub fn compute_discount(mrp: f64, batches: &[Batch], today: NaiveDate) -> DiscountQuote {
    let qualifying: Vec<QualifyingBatch> = batches
        .iter()
        .filter(|b| b.quantity > 0)
        .filter(|b| classify(b.days_left(today)) == ExpiryStatus::Critical)
        .map(|b| QualifyingBatch {
            batch_id: b.id,
            batch_number: b.batch_number.clone(),
            days_left: b.days_left(today),
            quantity: b.quantity,
            expiry_date: b.expiry_date,
        })
        .collect();

    if qualifying.is_empty() {
        return DiscountQuote {
            has_discount: false,
            discount_pct: 0,
            original_price: mrp,
            discounted_price: mrp,
            qualifying_batches: qualifying,
            reason: None,
        };
    }

    let reason = format!(
        "Flash sale: {} batch(es) expiring within 7 days",
        qualifying.len()
    );

    DiscountQuote {
        has_discount: true,
        discount_pct: PULSE_DISCOUNT_PCT,
        original_price: mrp,
        discounted_price: round2(mrp * (1.0 - PULSE_DISCOUNT_PCT as f64 / 100.0)),
        qualifying_batches: qualifying,
        reason: Some(reason),
    }
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
    fn critical_batch_triggers_flat_twenty_percent() {
        let today = date(2026, 3, 1);
        let batches = vec![batch(10, today + chrono::Days::new(5), 1)];

        let quote = compute_discount(100.0, &batches, today);
        assert!(quote.has_discount);
        assert_eq!(quote.discount_pct, 20);
        assert_eq!(quote.discounted_price, 80.0);
        assert_eq!(quote.qualifying_batches.len(), 1);
        assert_eq!(quote.qualifying_batches[0].days_left, 5);
        assert!(quote.reason.as_deref().unwrap().contains("1 batch(es)"));
    }

    #[test]
    fn fresh_stock_gets_no_discount() {
        let today = date(2026, 3, 1);
        let batches = vec![batch(10, today + chrono::Days::new(20), 1)];

        let quote = compute_discount(100.0, &batches, today);
        assert!(!quote.has_discount);
        assert_eq!(quote.discount_pct, 0);
        assert_eq!(quote.discounted_price, 100.0);
        assert!(quote.qualifying_batches.is_empty());
        assert!(quote.reason.is_none());
    }

    #[test]
    fn band_edges_match_the_classifier() {
        let today = date(2026, 3, 1);

        // Expired (0 days) and warning (7 days) batches never qualify.
        let edges = vec![
            batch(10, today, 1),
            batch(10, today + chrono::Days::new(7), 2),
        ];
        let quote = compute_discount(50.0, &edges, today);
        assert!(!quote.has_discount);

        // 1 and 6 days do.
        let inside = vec![
            batch(10, today + chrono::Days::new(1), 1),
            batch(10, today + chrono::Days::new(6), 2),
        ];
        let quote = compute_discount(50.0, &inside, today);
        assert!(quote.has_discount);
        assert_eq!(quote.qualifying_batches.len(), 2);
    }

    #[test]
    fn empty_critical_batches_do_not_qualify() {
        let today = date(2026, 3, 1);
        let batches = vec![batch(0, today + chrono::Days::new(3), 1)];

        let quote = compute_discount(100.0, &batches, today);
        assert!(!quote.has_discount);
    }

    #[test]
    fn discounted_price_is_rounded_to_two_decimals() {
        let today = date(2026, 3, 1);
        let batches = vec![batch(4, today + chrono::Days::new(2), 1)];

        let quote = compute_discount(49.99, &batches, today);
        assert_eq!(quote.discounted_price, 39.99);
    }
}
