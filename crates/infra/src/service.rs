//! `StoreService`: the facade the (excluded) API layer calls.
//!
//! Owns the event store, the dispatcher, every projection, the active-order
//! index, the replenishment engine, and the forecaster handle. One instance
//! per process, constructed by the host and shared behind `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use shelfpulse_core::{AggregateId, DomainError};
use shelfpulse_events::EventEnvelope;
use shelfpulse_forecast::{
    CategoryInsight, DatasetRecord, DemandForecast, DemandForecaster, ForecastError,
    SaleObservation,
};
use shelfpulse_ledger::{
    AllocateSale, Batch, BatchId, ExpiryStatus, LedgerCommand, LedgerEvent, OpenLedger,
    ReceiveBatch, RecordWastage, SaleAllocated, StockLedger, WastageRecorded,
};
use shelfpulse_parties::{RegisterSupplier, Supplier, SupplierCommand, SupplierId};
use shelfpulse_pricing::{alerts, pulse, DiscountQuote, ExpiryAlert};
use shelfpulse_products::{
    DefineProduct, DiscontinueProduct, Product, ProductCommand, ProductId, UpdateProduct,
};
use shelfpulse_purchasing::{
    MarkReceived, MarkSent, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
    PurchaseOrderStatus,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::InMemoryEventStore;
use crate::projections::catalog::{ProductCatalogProjection, ProductReadModel, PRODUCT_AGGREGATE};
use crate::projections::purchase_orders::{
    PurchaseOrderReadModel, PurchaseOrdersProjection, PURCHASE_ORDER_AGGREGATE,
};
use crate::projections::suppliers::{
    SupplierDirectoryProjection, SupplierReadModel, SUPPLIER_AGGREGATE,
};
use crate::projections::transactions::{
    TransactionLogProjection, TransactionRecord, LEDGER_AGGREGATE,
};
use crate::read_model::InMemoryReadStore;
use crate::replenishment::{ActiveOrderIndex, ReplenishmentEngine};

type Store = Arc<InMemoryEventStore>;
type CatalogStore = Arc<InMemoryReadStore<ProductId, ProductReadModel>>;
type SupplierStore = Arc<InMemoryReadStore<SupplierId, SupplierReadModel>>;
type OrderStore = Arc<InMemoryReadStore<PurchaseOrderId, PurchaseOrderReadModel>>;
type Engine = ReplenishmentEngine<Store, CatalogStore, SupplierStore, OrderStore>;

/// A product whose stock fell under its catalog threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub product_id: ProductId,
    pub product_name: String,
    pub item_id: String,
    pub category: String,
    pub current_stock: i64,
    pub min_stock: i64,
}

/// An expiry alert with its product context attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductExpiryAlert {
    pub product_id: ProductId,
    pub product_name: String,
    pub item_id: String,
    pub alert: ExpiryAlert,
}

pub struct StoreService {
    dispatcher: Arc<CommandDispatcher<Store>>,
    catalog: Arc<ProductCatalogProjection<CatalogStore>>,
    suppliers: Arc<SupplierDirectoryProjection<SupplierStore>>,
    transactions: Arc<TransactionLogProjection>,
    purchase_orders: Arc<PurchaseOrdersProjection<OrderStore>>,
    active_orders: Arc<ActiveOrderIndex>,
    replenishment: Engine,
    forecaster: Mutex<DemandForecaster>,
    /// Batch to owning product, maintained from ledger envelopes so wastage
    /// can be addressed by batch id alone.
    batch_index: RwLock<HashMap<BatchId, ProductId>>,
}

impl StoreService {
    pub fn new() -> Self {
        let store: Store = Arc::new(InMemoryEventStore::new());
        let dispatcher = Arc::new(CommandDispatcher::new(store));

        let catalog = Arc::new(ProductCatalogProjection::new(Arc::new(
            InMemoryReadStore::new(),
        )));
        let suppliers = Arc::new(SupplierDirectoryProjection::new(Arc::new(
            InMemoryReadStore::new(),
        )));
        let transactions = Arc::new(TransactionLogProjection::new());
        let purchase_orders = Arc::new(PurchaseOrdersProjection::new(Arc::new(
            InMemoryReadStore::new(),
        )));
        let active_orders = Arc::new(ActiveOrderIndex::new());

        let replenishment = ReplenishmentEngine::new(
            dispatcher.clone(),
            transactions.clone(),
            catalog.clone(),
            suppliers.clone(),
            purchase_orders.clone(),
            active_orders.clone(),
        );

        Self {
            dispatcher,
            catalog,
            suppliers,
            transactions,
            purchase_orders,
            active_orders,
            replenishment,
            forecaster: Mutex::new(DemandForecaster::new()),
            batch_index: RwLock::new(HashMap::new()),
        }
    }

    /// Feed committed envelopes to every projection (each ignores foreign
    /// aggregate types) and keep the batch index current.
    ///
    /// Projection failures here are programming errors on an in-memory path;
    /// they are logged rather than surfaced as operation failures.
    fn apply_envelopes(&self, envelopes: &[EventEnvelope<JsonValue>]) {
        for envelope in envelopes {
            if let Err(error) = self.catalog.apply_envelope(envelope) {
                warn!(error = %error, "catalog projection rejected envelope");
            }
            if let Err(error) = self.suppliers.apply_envelope(envelope) {
                warn!(error = %error, "supplier projection rejected envelope");
            }
            if let Err(error) = self.transactions.apply_envelope(envelope) {
                warn!(error = %error, "transaction projection rejected envelope");
            }
            if let Err(error) = self.purchase_orders.apply_envelope(envelope) {
                warn!(error = %error, "purchase order projection rejected envelope");
            }

            if envelope.aggregate_type() == LEDGER_AGGREGATE {
                if let Ok(LedgerEvent::BatchReceived(e)) =
                    serde_json::from_value::<LedgerEvent>(envelope.payload().clone())
                {
                    if let Ok(mut index) = self.batch_index.write() {
                        index.insert(e.batch_id, e.product_id);
                    }
                }
            }
        }
    }

    fn load_ledger(&self, product_id: ProductId) -> Result<StockLedger, DispatchError> {
        self.dispatcher.load(LEDGER_AGGREGATE, product_id.0, || {
            StockLedger::empty(product_id)
        })
    }

    // ---- catalog ----------------------------------------------------------

    pub fn define_product(
        &self,
        item_id: &str,
        name: &str,
        category: &str,
        mrp: f64,
        min_stock: i64,
    ) -> Result<ProductId, DispatchError> {
        if self.catalog.item_id_taken(item_id) {
            return Err(DomainError::conflict("item_id already exists").into());
        }

        let product_id = ProductId::new(AggregateId::new());
        let now = Utc::now();

        let (_, envelopes) = self.dispatcher.execute(
            PRODUCT_AGGREGATE,
            product_id.0,
            || Product::empty(product_id),
            &ProductCommand::DefineProduct(DefineProduct {
                product_id,
                item_id: item_id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                mrp,
                min_stock,
                occurred_at: now,
            }),
        )?;
        self.apply_envelopes(&envelopes);

        // Every product gets its stock ledger at definition time.
        let (_, envelopes) = self.dispatcher.execute(
            LEDGER_AGGREGATE,
            product_id.0,
            || StockLedger::empty(product_id),
            &LedgerCommand::OpenLedger(OpenLedger {
                product_id,
                item_id: item_id.to_string(),
                occurred_at: now,
            }),
        )?;
        self.apply_envelopes(&envelopes);

        Ok(product_id)
    }

    pub fn update_product(
        &self,
        product_id: ProductId,
        name: Option<String>,
        mrp: Option<f64>,
        min_stock: Option<i64>,
    ) -> Result<(), DispatchError> {
        let (_, envelopes) = self.dispatcher.execute(
            PRODUCT_AGGREGATE,
            product_id.0,
            || Product::empty(product_id),
            &ProductCommand::UpdateProduct(UpdateProduct {
                product_id,
                name,
                mrp,
                min_stock,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_envelopes(&envelopes);
        Ok(())
    }

    /// Discontinue a product. Its ledger, transactions, and any historical
    /// purchase orders survive; only the catalog entry is marked.
    pub fn discontinue_product(&self, product_id: ProductId) -> Result<(), DispatchError> {
        let (_, envelopes) = self.dispatcher.execute(
            PRODUCT_AGGREGATE,
            product_id.0,
            || Product::empty(product_id),
            &ProductCommand::DiscontinueProduct(DiscontinueProduct {
                product_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_envelopes(&envelopes);
        Ok(())
    }

    pub fn product(&self, product_id: ProductId) -> Option<ProductReadModel> {
        self.catalog.get(product_id)
    }

    pub fn products(&self) -> Vec<ProductReadModel> {
        self.catalog.list()
    }

    // ---- suppliers --------------------------------------------------------

    pub fn register_supplier(
        &self,
        name: &str,
        category: &str,
        contact_email: Option<String>,
        phone: Option<String>,
    ) -> Result<SupplierId, DispatchError> {
        // One primary supplier per category.
        if self.suppliers.category_taken(category) {
            return Err(DomainError::conflict("category already has a supplier").into());
        }

        let supplier_id = SupplierId::new(AggregateId::new());
        let (_, envelopes) = self.dispatcher.execute(
            SUPPLIER_AGGREGATE,
            supplier_id.0,
            || Supplier::empty(supplier_id),
            &SupplierCommand::RegisterSupplier(RegisterSupplier {
                supplier_id,
                name: name.to_string(),
                category: category.to_string(),
                contact_email,
                phone,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_envelopes(&envelopes);
        Ok(supplier_id)
    }

    pub fn suppliers(&self) -> Vec<SupplierReadModel> {
        self.suppliers.list()
    }

    // ---- ledger -----------------------------------------------------------

    /// Restock: create a new batch and its restock transaction.
    pub fn restock(
        &self,
        product_id: ProductId,
        quantity: i64,
        cost_price: f64,
        manufacture_date: Option<NaiveDate>,
        expiry_date: NaiveDate,
    ) -> Result<Batch, DispatchError> {
        if self.catalog.get(product_id).is_none() {
            return Err(DomainError::ProductNotFound.into());
        }

        let batch_id = BatchId::new();
        let (ledger, envelopes) = self.dispatcher.execute(
            LEDGER_AGGREGATE,
            product_id.0,
            || StockLedger::empty(product_id),
            &LedgerCommand::ReceiveBatch(ReceiveBatch {
                product_id,
                batch_id,
                quantity,
                cost_price,
                manufacture_date,
                expiry_date,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_envelopes(&envelopes);

        ledger
            .batch(batch_id)
            .cloned()
            .ok_or_else(|| DispatchError::Deserialize("received batch missing".to_string()))
    }

    /// Sell: FIFO-by-expiry allocation, then the replenishment trigger.
    ///
    /// `unit_price` defaults to the catalog list price. The trigger runs
    /// after the sale has committed and can never fail it.
    pub fn allocate_sale(
        &self,
        product_id: ProductId,
        quantity: i64,
        unit_price: Option<f64>,
    ) -> Result<SaleAllocated, DispatchError> {
        let product = self
            .catalog
            .get(product_id)
            .ok_or(DomainError::ProductNotFound)?;
        if product.status == shelfpulse_products::ProductStatus::Discontinued {
            return Err(DomainError::invariant("cannot sell a discontinued product").into());
        }
        let price = unit_price.unwrap_or(product.mrp);
        let now = Utc::now();

        let (_, envelopes) = self.dispatcher.execute(
            LEDGER_AGGREGATE,
            product_id.0,
            || StockLedger::empty(product_id),
            &LedgerCommand::AllocateSale(AllocateSale {
                product_id,
                quantity,
                unit_price: price,
                occurred_at: now,
            }),
        )?;
        self.apply_envelopes(&envelopes);

        let allocated = envelopes
            .iter()
            .find_map(|env| {
                match serde_json::from_value::<LedgerEvent>(env.payload().clone()) {
                    Ok(LedgerEvent::SaleAllocated(e)) => Some(e),
                    _ => None,
                }
            })
            .ok_or_else(|| DispatchError::Deserialize("sale event missing".to_string()))?;

        self.replenishment.on_sale_completed(product_id, now);
        Ok(allocated)
    }

    /// Wastage write-off against one batch, clamped at its remaining stock.
    pub fn record_wastage(
        &self,
        batch_id: BatchId,
        quantity: i64,
        unit_price: Option<f64>,
    ) -> Result<WastageRecorded, DispatchError> {
        let product_id = self
            .batch_index
            .read()
            .ok()
            .and_then(|index| index.get(&batch_id).copied())
            .ok_or(DomainError::BatchNotFound)?;
        let price = unit_price
            .or_else(|| self.catalog.get(product_id).map(|p| p.mrp))
            .unwrap_or(0.0);

        let (_, envelopes) = self.dispatcher.execute(
            LEDGER_AGGREGATE,
            product_id.0,
            || StockLedger::empty(product_id),
            &LedgerCommand::RecordWastage(RecordWastage {
                product_id,
                batch_id,
                quantity,
                unit_price: price,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_envelopes(&envelopes);

        envelopes
            .iter()
            .find_map(|env| {
                match serde_json::from_value::<LedgerEvent>(env.payload().clone()) {
                    Ok(LedgerEvent::WastageRecorded(e)) => Some(e),
                    _ => None,
                }
            })
            .ok_or_else(|| DispatchError::Deserialize("wastage event missing".to_string()))
    }

    pub fn total_stock(&self, product_id: ProductId) -> Result<i64, DispatchError> {
        if self.catalog.get(product_id).is_none() {
            return Err(DomainError::ProductNotFound.into());
        }
        Ok(self.load_ledger(product_id)?.total_stock())
    }

    pub fn batches(&self, product_id: ProductId) -> Result<Vec<Batch>, DispatchError> {
        if self.catalog.get(product_id).is_none() {
            return Err(DomainError::ProductNotFound.into());
        }
        Ok(self.load_ledger(product_id)?.batches().to_vec())
    }

    // ---- read paths -------------------------------------------------------

    pub fn compute_discount(&self, product_id: ProductId) -> Result<DiscountQuote, DispatchError> {
        let product = self
            .catalog
            .get(product_id)
            .ok_or(DomainError::ProductNotFound)?;
        let ledger = self.load_ledger(product_id)?;
        Ok(pulse::compute_discount(
            product.mrp,
            ledger.batches(),
            Utc::now().date_naive(),
        ))
    }

    /// Expiry report across the whole catalog, soonest expiry first.
    pub fn expiry_alerts(&self, horizon_days: i64) -> Vec<ProductExpiryAlert> {
        let today = Utc::now().date_naive();
        let mut result = Vec::new();
        for product in self.catalog.list() {
            let ledger = match self.load_ledger(product.product_id) {
                Ok(ledger) => ledger,
                Err(error) => {
                    warn!(product_id = %product.product_id, error = %error, "skipping product in expiry report");
                    continue;
                }
            };
            for alert in alerts::expiry_alerts(ledger.batches(), today, horizon_days) {
                result.push(ProductExpiryAlert {
                    product_id: product.product_id,
                    product_name: product.name.clone(),
                    item_id: product.item_id.clone(),
                    alert,
                });
            }
        }
        result.sort_by_key(|a| a.alert.expiry_date);
        result
    }

    pub fn low_stock_products(&self) -> Vec<StockAlert> {
        let mut result = Vec::new();
        for product in self.catalog.list() {
            let Ok(ledger) = self.load_ledger(product.product_id) else {
                continue;
            };
            let current_stock = ledger.total_stock();
            if current_stock < product.min_stock {
                result.push(StockAlert {
                    product_id: product.product_id,
                    product_name: product.name,
                    item_id: product.item_id,
                    category: product.category,
                    current_stock,
                    min_stock: product.min_stock,
                });
            }
        }
        result
    }

    pub fn expiry_status(&self, days_left: i64) -> ExpiryStatus {
        shelfpulse_ledger::classify(days_left)
    }

    // ---- transactions -----------------------------------------------------

    pub fn transactions(&self, limit: usize) -> Vec<TransactionRecord> {
        self.transactions.recent(limit)
    }

    pub fn transactions_for_product(&self, product_id: ProductId) -> Vec<TransactionRecord> {
        self.transactions.for_product(product_id)
    }

    pub fn revenue_total(&self) -> f64 {
        self.transactions.revenue_total()
    }

    pub fn wastage_loss_total(&self) -> f64 {
        self.transactions.wastage_loss_total()
    }

    // ---- forecasting ------------------------------------------------------

    /// Train the forecaster from explicit observations.
    ///
    /// Best-effort: a bad dataset is logged and the forecaster keeps its
    /// previous models.
    pub fn train_forecaster(&self, observations: &[SaleObservation]) {
        let mut forecaster = self
            .forecaster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(error) = forecaster.train(observations) {
            warn!(error = %error, "forecaster training failed; keeping previous models");
        }
    }

    /// Cold-start bootstrap from a yearly-aggregated dataset.
    pub fn train_forecaster_from_dataset(&self, records: &[DatasetRecord]) {
        let mut forecaster = self
            .forecaster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(error) = forecaster.train_from_dataset(records) {
            warn!(error = %error, "forecaster bootstrap failed; keeping previous models");
        }
    }

    /// Train from this store's own sale history (transaction log joined with
    /// catalog categories).
    pub fn train_forecaster_from_history(&self) {
        use chrono::Datelike;
        use crate::projections::transactions::TransactionKind;

        let observations: Vec<SaleObservation> = self
            .transactions
            .all()
            .into_iter()
            .filter(|r| r.kind == TransactionKind::Sale)
            .filter_map(|r| {
                let product = self.catalog.get(r.product_id)?;
                Some(SaleObservation {
                    category: product.category,
                    month: r.occurred_at.month(),
                    quantity: r.quantity,
                    amount: r.total_amount,
                })
            })
            .collect();
        self.train_forecaster(&observations);
    }

    pub fn predict_demand(
        &self,
        category: &str,
        month: u32,
    ) -> Result<DemandForecast, ForecastError> {
        self.forecaster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .predict(category, month)
    }

    /// Insights across all trained categories; empty until trained.
    pub fn insights(&self) -> Vec<CategoryInsight> {
        self.forecaster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insights()
    }

    pub fn reset_forecaster(&self) {
        self.forecaster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reset();
    }

    // ---- purchase orders --------------------------------------------------

    pub fn purchase_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
    ) -> Vec<PurchaseOrderReadModel> {
        match status {
            Some(status) => self.purchase_orders.by_status(status),
            None => self.purchase_orders.list(),
        }
    }

    pub fn active_order_for(&self, product_id: ProductId) -> Option<PurchaseOrderReadModel> {
        self.purchase_orders.active_for_product(product_id)
    }

    pub fn mark_order_sent(&self, order_id: PurchaseOrderId) -> Result<(), DispatchError> {
        let (_, envelopes) = self.dispatcher.execute(
            PURCHASE_ORDER_AGGREGATE,
            order_id.0,
            || PurchaseOrder::empty(order_id),
            &PurchaseOrderCommand::MarkSent(MarkSent {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_envelopes(&envelopes);
        Ok(())
    }

    /// Receiving an order ends its active window: the product becomes
    /// eligible for a fresh draft.
    pub fn mark_order_received(&self, order_id: PurchaseOrderId) -> Result<(), DispatchError> {
        let (order, envelopes) = self.dispatcher.execute(
            PURCHASE_ORDER_AGGREGATE,
            order_id.0,
            || PurchaseOrder::empty(order_id),
            &PurchaseOrderCommand::MarkReceived(MarkReceived {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_envelopes(&envelopes);

        if let Some(product_id) = order.product_id() {
            self.active_orders.release(product_id, order_id);
        }
        Ok(())
    }
}

impl Default for StoreService {
    fn default() -> Self {
        Self::new()
    }
}
