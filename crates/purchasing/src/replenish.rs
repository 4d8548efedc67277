//! Replenishment policy: stock-out projection from trailing sales velocity.
//!
//! Pure decision logic. The caller supplies trailing demand and current stock;
//! this module decides whether an order is warranted and how big it should be.
//! De-duplication against active orders and supplier lookup happen in the
//! storage layer, where they can be made atomic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Velocity at or below which demand is treated as noise (units/day).
pub const MIN_VELOCITY: f64 = 0.1;

/// Project an order only when stock-out is within this many days.
pub const URGENCY_WINDOW_DAYS: f64 = 2.0;

/// Minimum order size, in units.
pub const MIN_ORDER_QUANTITY: i64 = 20;

/// Days of projected demand one order should cover.
pub const COVER_DAYS: f64 = 7.0;

/// Inputs the trigger derives from ledger + transaction history.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentInputs {
    /// Sum of sale quantities over the trailing 30 days.
    pub trailing_sales_30d: i64,
    pub current_stock: i64,
    pub today: NaiveDate,
}

/// A proposed draft order.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProposal {
    pub quantity: i64,
    pub velocity: f64,
    pub days_until_stockout: f64,
    pub predicted_stockout_date: NaiveDate,
}

/// Decide whether stock-out is imminent enough to draft an order.
///
/// - velocity = trailing 30-day sales / 30 (simple moving average)
/// - velocity at or below [`MIN_VELOCITY`] is ignored (noise, and keeps the
///   stock-out division away from near-zero)
/// - stock-out further than [`URGENCY_WINDOW_DAYS`] out is not urgent
/// - order quantity covers [`COVER_DAYS`] of demand, floored at
///   [`MIN_ORDER_QUANTITY`]
pub fn evaluate(inputs: &ReplenishmentInputs) -> Option<OrderProposal> {
    let velocity = inputs.trailing_sales_30d as f64 / 30.0;
    if velocity <= MIN_VELOCITY {
        return None;
    }

    let days_until_stockout = inputs.current_stock as f64 / velocity;
    if days_until_stockout > URGENCY_WINDOW_DAYS {
        return None;
    }

    let quantity = ((velocity * COVER_DAYS).round() as i64).max(MIN_ORDER_QUANTITY);
    let predicted_stockout_date =
        inputs.today + chrono::Duration::days(days_until_stockout as i64);

    Some(OrderProposal {
        quantity,
        velocity,
        days_until_stockout,
        predicted_stockout_date,
    })
}
