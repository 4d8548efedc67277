//! Post-sale replenishment trigger.
//!
//! Runs after a sale has committed. Estimates trailing demand velocity,
//! projects the stock-out date, and drafts a deduplicated purchase order via
//! the supplier directory. Anything that goes wrong in here is caught and
//! logged: the sale has already committed and must not be failed or rolled
//! back by its side effects.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use shelfpulse_core::AggregateId;
use shelfpulse_ledger::StockLedger;
use shelfpulse_parties::SupplierId;
use shelfpulse_products::ProductId;
use shelfpulse_purchasing::{
    evaluate, DraftOrder, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
    ReplenishmentInputs,
};

use crate::command_dispatcher::CommandDispatcher;
use crate::event_store::EventStore;
use crate::projections::catalog::ProductCatalogProjection;
use crate::projections::purchase_orders::{
    PurchaseOrderReadModel, PurchaseOrdersProjection, PURCHASE_ORDER_AGGREGATE,
};
use crate::projections::suppliers::{SupplierDirectoryProjection, SupplierReadModel};
use crate::projections::transactions::{TransactionLogProjection, LEDGER_AGGREGATE};
use crate::projections::ProductReadModel;
use crate::read_model::ReadStore;
use crate::replenishment::ActiveOrderIndex;

/// Trailing window for the demand velocity estimate.
const VELOCITY_WINDOW_DAYS: i64 = 30;

pub struct ReplenishmentEngine<S, CS, SS, OS>
where
    S: EventStore,
    CS: ReadStore<ProductId, ProductReadModel>,
    SS: ReadStore<SupplierId, SupplierReadModel>,
    OS: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    dispatcher: Arc<CommandDispatcher<S>>,
    transactions: Arc<TransactionLogProjection>,
    catalog: Arc<ProductCatalogProjection<CS>>,
    suppliers: Arc<SupplierDirectoryProjection<SS>>,
    purchase_orders: Arc<PurchaseOrdersProjection<OS>>,
    active_orders: Arc<ActiveOrderIndex>,
}

impl<S, CS, SS, OS> ReplenishmentEngine<S, CS, SS, OS>
where
    S: EventStore,
    CS: ReadStore<ProductId, ProductReadModel>,
    SS: ReadStore<SupplierId, SupplierReadModel>,
    OS: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(
        dispatcher: Arc<CommandDispatcher<S>>,
        transactions: Arc<TransactionLogProjection>,
        catalog: Arc<ProductCatalogProjection<CS>>,
        suppliers: Arc<SupplierDirectoryProjection<SS>>,
        purchase_orders: Arc<PurchaseOrdersProjection<OS>>,
        active_orders: Arc<ActiveOrderIndex>,
    ) -> Self {
        Self {
            dispatcher,
            transactions,
            catalog,
            suppliers,
            purchase_orders,
            active_orders,
        }
    }

    /// Hook invoked by the service after every committed sale.
    ///
    /// Never fails the originating sale: every error ends here, logged.
    pub fn on_sale_completed(&self, product_id: ProductId, now: DateTime<Utc>) {
        if let Err(error) = self.try_replenish(product_id, now) {
            warn!(
                product_id = %product_id,
                error = %error,
                "replenishment trigger failed; sale is unaffected"
            );
        }
    }

    fn try_replenish(&self, product_id: ProductId, now: DateTime<Utc>) -> anyhow::Result<()> {
        let since = now - Duration::days(VELOCITY_WINDOW_DAYS);
        let trailing_sales_30d = self
            .transactions
            .sales_quantity_between(product_id, since, now);

        let ledger: StockLedger = self
            .dispatcher
            .load(LEDGER_AGGREGATE, product_id.0, || {
                StockLedger::empty(product_id)
            })
            .context("loading stock ledger")?;

        let inputs = ReplenishmentInputs {
            trailing_sales_30d,
            current_stock: ledger.total_stock(),
            today: now.date_naive(),
        };
        let Some(proposal) = evaluate(&inputs) else {
            return Ok(());
        };

        // At most one active order per product: claim atomically before
        // drafting, release on any skip or failure.
        let order_id = PurchaseOrderId::new(AggregateId::new());
        if !self.active_orders.try_claim(product_id, order_id) {
            debug!(
                product_id = %product_id,
                "active purchase order exists; suppressing duplicate draft"
            );
            return Ok(());
        }

        let product = match self.catalog.get(product_id) {
            Some(product) => product,
            None => {
                self.active_orders.release(product_id, order_id);
                return Err(anyhow!("product missing from catalog"));
            }
        };
        let Some(supplier) = self.suppliers.find_by_category(&product.category) else {
            self.active_orders.release(product_id, order_id);
            debug!(
                product_id = %product_id,
                category = %product.category,
                "no supplier registered for category; skipping draft order"
            );
            return Ok(());
        };

        let command = PurchaseOrderCommand::DraftOrder(DraftOrder {
            order_id,
            supplier_id: supplier.supplier_id,
            product_id,
            quantity: proposal.quantity,
            predicted_stockout_date: proposal.predicted_stockout_date,
            occurred_at: now,
        });
        let envelopes = match self.dispatcher.execute(
            PURCHASE_ORDER_AGGREGATE,
            order_id.0,
            || PurchaseOrder::empty(order_id),
            &command,
        ) {
            Ok((_, envelopes)) => envelopes,
            Err(error) => {
                self.active_orders.release(product_id, order_id);
                return Err(error).context("drafting purchase order");
            }
        };

        for envelope in &envelopes {
            self.purchase_orders
                .apply_envelope(envelope)
                .context("projecting purchase order")?;
        }

        info!(
            product_id = %product_id,
            order_id = %order_id,
            quantity = proposal.quantity,
            days_until_stockout = proposal.days_until_stockout,
            "drafted replenishment order"
        );
        Ok(())
    }
}
