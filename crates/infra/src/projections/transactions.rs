//! Immutable transaction audit log, projected from ledger events.
//!
//! One row per ledger mutation: restocks and sales carry no batch id (a sale
//! can span batches), wastage names the batch it wrote off. Rows are created,
//! never updated or deleted.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use shelfpulse_events::EventEnvelope;
use shelfpulse_ledger::{BatchId, LedgerEvent};
use shelfpulse_products::ProductId;

use super::cursor::{CursorError, StreamCursors};

pub const LEDGER_AGGREGATE: &str = "ledger.stock";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Sale,
    Wastage,
    Restock,
}

/// One immutable audit record of a ledger mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub product_id: ProductId,
    pub batch_id: Option<BatchId>,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_amount: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TransactionProjectionError {
    #[error("failed to deserialize ledger event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Append-only transaction log.
#[derive(Debug, Default)]
pub struct TransactionLogProjection {
    records: RwLock<Vec<TransactionRecord>>,
    cursors: StreamCursors,
}

impl TransactionLogProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a published envelope. Envelopes of other aggregate types are
    /// ignored; duplicates are skipped via the stream cursor.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), TransactionProjectionError> {
        if envelope.aggregate_type() != LEDGER_AGGREGATE {
            return Ok(());
        }
        if !self
            .cursors
            .observe(envelope.aggregate_id(), envelope.sequence_number())?
        {
            return Ok(());
        }

        let event: LedgerEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| TransactionProjectionError::Deserialize(e.to_string()))?;

        let record = match event {
            LedgerEvent::LedgerOpened(_) => None,
            LedgerEvent::BatchReceived(e) => Some(TransactionRecord {
                id: envelope.event_id(),
                product_id: e.product_id,
                batch_id: None,
                kind: TransactionKind::Restock,
                quantity: e.quantity,
                unit_price: e.cost_price,
                total_amount: e.total_amount,
                occurred_at: e.occurred_at,
            }),
            LedgerEvent::SaleAllocated(e) => Some(TransactionRecord {
                id: envelope.event_id(),
                product_id: e.product_id,
                batch_id: None,
                kind: TransactionKind::Sale,
                quantity: e.quantity,
                unit_price: e.unit_price,
                total_amount: e.total_amount,
                occurred_at: e.occurred_at,
            }),
            LedgerEvent::WastageRecorded(e) => Some(TransactionRecord {
                id: envelope.event_id(),
                product_id: e.product_id,
                batch_id: Some(e.batch_id),
                kind: TransactionKind::Wastage,
                quantity: e.requested,
                unit_price: e.unit_price,
                total_amount: e.total_amount,
                occurred_at: e.occurred_at,
            }),
        };

        if let Some(record) = record {
            if let Ok(mut records) = self.records.write() {
                records.push(record);
            }
        }
        Ok(())
    }

    pub fn all(&self) -> Vec<TransactionRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Vec<TransactionRecord> {
        let mut records = self.all();
        records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        records.truncate(limit);
        records
    }

    pub fn for_product(&self, product_id: ProductId) -> Vec<TransactionRecord> {
        self.all()
            .into_iter()
            .filter(|r| r.product_id == product_id)
            .collect()
    }

    /// Sum of sale quantities for a product inside a time window
    /// (the replenishment trigger's trailing-demand input).
    pub fn sales_quantity_between(
        &self,
        product_id: ProductId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> i64 {
        self.all()
            .iter()
            .filter(|r| {
                r.product_id == product_id
                    && r.kind == TransactionKind::Sale
                    && r.occurred_at >= from
                    && r.occurred_at <= to
            })
            .map(|r| r.quantity)
            .sum()
    }

    pub fn revenue_total(&self) -> f64 {
        self.total_for(TransactionKind::Sale)
    }

    pub fn wastage_loss_total(&self) -> f64 {
        self.total_for(TransactionKind::Wastage)
    }

    fn total_for(&self, kind: TransactionKind) -> f64 {
        self.all()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.total_amount)
            .sum()
    }
}
