//! Atomic "at most one active purchase order per product" guard.
//!
//! The check-then-create sequence in the replenishment trigger is a classic
//! check-then-act race: two sales crossing the stock-out threshold at the
//! same time must not both draft an order. This index turns the check into an
//! atomic insert-if-none-active under one lock, the in-memory equivalent of a
//! partial unique constraint on active orders.

use std::collections::HashMap;
use std::sync::Mutex;

use shelfpulse_products::ProductId;
use shelfpulse_purchasing::PurchaseOrderId;

#[derive(Debug, Default)]
pub struct ActiveOrderIndex {
    inner: Mutex<HashMap<ProductId, PurchaseOrderId>>,
}

impl ActiveOrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the active-order slot for a product.
    ///
    /// Returns `false` (and changes nothing) when another order already holds
    /// the slot. Claim before drafting; release if the draft fails to commit.
    pub fn try_claim(&self, product_id: ProductId, order_id: PurchaseOrderId) -> bool {
        let Ok(mut index) = self.inner.lock() else {
            return false;
        };
        if index.contains_key(&product_id) {
            return false;
        }
        index.insert(product_id, order_id);
        true
    }

    /// Release the slot, but only if it is still held by `order_id`.
    pub fn release(&self, product_id: ProductId, order_id: PurchaseOrderId) {
        if let Ok(mut index) = self.inner.lock() {
            if index.get(&product_id) == Some(&order_id) {
                index.remove(&product_id);
            }
        }
    }

    pub fn active_order(&self, product_id: ProductId) -> Option<PurchaseOrderId> {
        self.inner.lock().ok()?.get(&product_id).copied()
    }
}
