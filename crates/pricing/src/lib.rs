//! `shelfpulse-pricing`
//!
//! **Responsibility:** Read-path pricing and alerting over already-fetched
//! batch state. Nothing here mutates the ledger:
//! - The pulse engine derives the expiry-driven flash discount.
//! - The alert builder reports batches approaching (or past) expiry.
//!
//! Both lean on the one shared expiry classifier in `shelfpulse-ledger`.

pub mod alerts;
pub mod pulse;

pub use alerts::{expiry_alerts, ExpiryAlert};
pub use pulse::{compute_discount, DiscountQuote, QualifyingBatch, PULSE_DISCOUNT_PCT};
