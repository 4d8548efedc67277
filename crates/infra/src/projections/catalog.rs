//! Product catalog read model.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use shelfpulse_events::EventEnvelope;
use shelfpulse_products::{ProductEvent, ProductId, ProductStatus};

use super::cursor::{CursorError, StreamCursors};
use crate::read_model::ReadStore;

pub const PRODUCT_AGGREGATE: &str = "catalog.product";

/// Queryable catalog entry for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReadModel {
    pub product_id: ProductId,
    pub item_id: String,
    pub name: String,
    pub category: String,
    pub mrp: f64,
    pub min_stock: i64,
    pub status: ProductStatus,
}

#[derive(Debug, Error)]
pub enum CatalogProjectionError {
    #[error("failed to deserialize product event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Product catalog projection.
///
/// Keeps a secondary item-id index so the service layer can enforce item-id
/// uniqueness before dispatching a define command (cross-aggregate constraint,
/// storage-layer responsibility).
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, ProductReadModel>,
{
    store: S,
    item_ids: RwLock<HashMap<String, ProductId>>,
    cursors: StreamCursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, ProductReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            item_ids: RwLock::new(HashMap::new()),
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, product_id: ProductId) -> Option<ProductReadModel> {
        self.store.get(&product_id)
    }

    pub fn list(&self) -> Vec<ProductReadModel> {
        let mut products = self.store.list();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products
    }

    pub fn find_by_item_id(&self, item_id: &str) -> Option<ProductReadModel> {
        let product_id = *self.item_ids.read().ok()?.get(item_id)?;
        self.store.get(&product_id)
    }

    pub fn item_id_taken(&self, item_id: &str) -> bool {
        self.item_ids
            .read()
            .map(|index| index.contains_key(item_id))
            .unwrap_or(false)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CatalogProjectionError> {
        if envelope.aggregate_type() != PRODUCT_AGGREGATE {
            return Ok(());
        }
        if !self
            .cursors
            .observe(envelope.aggregate_id(), envelope.sequence_number())?
        {
            return Ok(());
        }

        let event: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CatalogProjectionError::Deserialize(e.to_string()))?;

        match event {
            ProductEvent::ProductDefined(e) => {
                if let Ok(mut index) = self.item_ids.write() {
                    index.insert(e.item_id.clone(), e.product_id);
                }
                self.store.upsert(
                    e.product_id,
                    ProductReadModel {
                        product_id: e.product_id,
                        item_id: e.item_id,
                        name: e.name,
                        category: e.category,
                        mrp: e.mrp,
                        min_stock: e.min_stock,
                        status: ProductStatus::Active,
                    },
                );
            }
            ProductEvent::ProductUpdated(e) => {
                if let Some(mut model) = self.store.get(&e.product_id) {
                    if let Some(name) = e.name {
                        model.name = name;
                    }
                    if let Some(mrp) = e.mrp {
                        model.mrp = mrp;
                    }
                    if let Some(min_stock) = e.min_stock {
                        model.min_stock = min_stock;
                    }
                    self.store.upsert(e.product_id, model);
                }
            }
            ProductEvent::ProductDiscontinued(e) => {
                if let Some(mut model) = self.store.get(&e.product_id) {
                    model.status = ProductStatus::Discontinued;
                    self.store.upsert(e.product_id, model);
                }
            }
        }
        Ok(())
    }
}
