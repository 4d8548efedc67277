//! Supplier directory read model (one primary supplier per category).

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use shelfpulse_events::EventEnvelope;
use shelfpulse_parties::{SupplierEvent, SupplierId};

use super::cursor::{CursorError, StreamCursors};
use crate::read_model::ReadStore;

pub const SUPPLIER_AGGREGATE: &str = "parties.supplier";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierReadModel {
    pub supplier_id: SupplierId,
    pub name: String,
    pub category: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Error)]
pub enum SupplierProjectionError {
    #[error("failed to deserialize supplier event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Supplier directory projection.
///
/// The category index backs both the replenishment trigger's lookup and the
/// registration-time uniqueness check.
#[derive(Debug)]
pub struct SupplierDirectoryProjection<S>
where
    S: ReadStore<SupplierId, SupplierReadModel>,
{
    store: S,
    by_category: RwLock<HashMap<String, SupplierId>>,
    cursors: StreamCursors,
}

impl<S> SupplierDirectoryProjection<S>
where
    S: ReadStore<SupplierId, SupplierReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            by_category: RwLock::new(HashMap::new()),
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, supplier_id: SupplierId) -> Option<SupplierReadModel> {
        self.store.get(&supplier_id)
    }

    pub fn list(&self) -> Vec<SupplierReadModel> {
        let mut suppliers = self.store.list();
        suppliers.sort_by(|a, b| a.category.cmp(&b.category));
        suppliers
    }

    pub fn find_by_category(&self, category: &str) -> Option<SupplierReadModel> {
        let supplier_id = *self.by_category.read().ok()?.get(category)?;
        self.store.get(&supplier_id)
    }

    pub fn category_taken(&self, category: &str) -> bool {
        self.by_category
            .read()
            .map(|index| index.contains_key(category))
            .unwrap_or(false)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), SupplierProjectionError> {
        if envelope.aggregate_type() != SUPPLIER_AGGREGATE {
            return Ok(());
        }
        if !self
            .cursors
            .observe(envelope.aggregate_id(), envelope.sequence_number())?
        {
            return Ok(());
        }

        let event: SupplierEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| SupplierProjectionError::Deserialize(e.to_string()))?;

        match event {
            SupplierEvent::SupplierRegistered(e) => {
                if let Ok(mut index) = self.by_category.write() {
                    index.insert(e.category.clone(), e.supplier_id);
                }
                self.store.upsert(
                    e.supplier_id,
                    SupplierReadModel {
                        supplier_id: e.supplier_id,
                        name: e.name,
                        category: e.category,
                        contact_email: e.contact_email,
                        phone: e.phone,
                    },
                );
            }
            SupplierEvent::SupplierContactUpdated(e) => {
                if let Some(mut model) = self.store.get(&e.supplier_id) {
                    model.contact_email = e.contact_email;
                    model.phone = e.phone;
                    self.store.upsert(e.supplier_id, model);
                }
            }
        }
        Ok(())
    }
}
