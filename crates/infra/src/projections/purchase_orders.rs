//! Purchase order read model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use shelfpulse_events::EventEnvelope;
use shelfpulse_parties::SupplierId;
use shelfpulse_products::ProductId;
use shelfpulse_purchasing::{PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus};

use super::cursor::{CursorError, StreamCursors};
use crate::read_model::ReadStore;

pub const PURCHASE_ORDER_AGGREGATE: &str = "purchasing.order";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderReadModel {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub status: PurchaseOrderStatus,
    pub predicted_stockout_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PurchaseOrderProjectionError {
    #[error("failed to deserialize purchase order event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Purchase orders projection.
#[derive(Debug)]
pub struct PurchaseOrdersProjection<S>
where
    S: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> PurchaseOrdersProjection<S>
where
    S: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, order_id: PurchaseOrderId) -> Option<PurchaseOrderReadModel> {
        self.store.get(&order_id)
    }

    /// Newest first.
    pub fn list(&self) -> Vec<PurchaseOrderReadModel> {
        let mut orders = self.store.list();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub fn by_status(&self, status: PurchaseOrderStatus) -> Vec<PurchaseOrderReadModel> {
        self.list()
            .into_iter()
            .filter(|o| o.status == status)
            .collect()
    }

    /// The active (draft or sent) order for a product, if any.
    pub fn active_for_product(&self, product_id: ProductId) -> Option<PurchaseOrderReadModel> {
        self.store
            .list()
            .into_iter()
            .find(|o| o.product_id == product_id && o.status.is_active())
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), PurchaseOrderProjectionError> {
        if envelope.aggregate_type() != PURCHASE_ORDER_AGGREGATE {
            return Ok(());
        }
        if !self
            .cursors
            .observe(envelope.aggregate_id(), envelope.sequence_number())?
        {
            return Ok(());
        }

        let event: PurchaseOrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| PurchaseOrderProjectionError::Deserialize(e.to_string()))?;

        match event {
            PurchaseOrderEvent::PurchaseOrderDrafted(e) => {
                self.store.upsert(
                    e.order_id,
                    PurchaseOrderReadModel {
                        order_id: e.order_id,
                        supplier_id: e.supplier_id,
                        product_id: e.product_id,
                        quantity: e.quantity,
                        status: PurchaseOrderStatus::Draft,
                        predicted_stockout_date: e.predicted_stockout_date,
                        created_at: e.occurred_at,
                    },
                );
            }
            PurchaseOrderEvent::PurchaseOrderSent(e) => {
                if let Some(mut model) = self.store.get(&e.order_id) {
                    model.status = PurchaseOrderStatus::Sent;
                    self.store.upsert(e.order_id, model);
                }
            }
            PurchaseOrderEvent::PurchaseOrderReceived(e) => {
                if let Some(mut model) = self.store.get(&e.order_id) {
                    model.status = PurchaseOrderStatus::Received;
                    self.store.upsert(e.order_id, model);
                }
            }
        }
        Ok(())
    }
}
