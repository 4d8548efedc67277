use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shelfpulse_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use shelfpulse_events::Event;
use shelfpulse_parties::SupplierId;
use shelfpulse_products::ProductId;

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle: forward-only, no reverse transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Received,
}

impl PurchaseOrderStatus {
    /// Active orders (draft or sent) are the de-duplication key: at most one
    /// per product at a time.
    pub fn is_active(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Draft | PurchaseOrderStatus::Sent)
    }
}

/// Aggregate root: PurchaseOrder.
///
/// Drafted by the replenishment trigger; the sent/received transitions belong
/// to the external procurement workflow. References supplier and product by
/// id without owning either, so historical orders survive catalog changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    supplier_id: Option<SupplierId>,
    product_id: Option<ProductId>,
    quantity: i64,
    status: PurchaseOrderStatus,
    predicted_stockout_date: Option<NaiveDate>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            supplier_id: None,
            product_id: None,
            quantity: 0,
            status: PurchaseOrderStatus::Draft,
            predicted_stockout_date: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn predicted_stockout_date(&self) -> Option<NaiveDate> {
        self.predicted_stockout_date
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.created && self.status.is_active()
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: DraftOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrder {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub predicted_stockout_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReceived {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    DraftOrder(DraftOrder),
    MarkSent(MarkSent),
    MarkReceived(MarkReceived),
}

/// Event: PurchaseOrderDrafted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderDrafted {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub predicted_stockout_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderSent {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderReceived {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderDrafted(PurchaseOrderDrafted),
    PurchaseOrderSent(PurchaseOrderSent),
    PurchaseOrderReceived(PurchaseOrderReceived),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderDrafted(_) => "purchasing.order.drafted",
            PurchaseOrderEvent::PurchaseOrderSent(_) => "purchasing.order.sent",
            PurchaseOrderEvent::PurchaseOrderReceived(_) => "purchasing.order.received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderDrafted(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderSent(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderReceived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderDrafted(e) => {
                self.id = e.order_id;
                self.supplier_id = Some(e.supplier_id);
                self.product_id = Some(e.product_id);
                self.quantity = e.quantity;
                self.status = PurchaseOrderStatus::Draft;
                self.predicted_stockout_date = Some(e.predicted_stockout_date);
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderSent(_) => {
                self.status = PurchaseOrderStatus::Sent;
            }
            PurchaseOrderEvent::PurchaseOrderReceived(_) => {
                self.status = PurchaseOrderStatus::Received;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::DraftOrder(cmd) => self.handle_draft(cmd),
            PurchaseOrderCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
            PurchaseOrderCommand::MarkReceived(cmd) => self.handle_mark_received(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_draft(&self, cmd: &DraftOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderDrafted(
            PurchaseOrderDrafted {
                order_id: cmd.order_id,
                supplier_id: cmd.supplier_id,
                product_id: cmd.product_id,
                quantity: cmd.quantity,
                predicted_stockout_date: cmd.predicted_stockout_date,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::invariant("purchase order does not exist"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "only draft purchase orders can be sent",
            ));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderSent(
            PurchaseOrderSent {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_received(
        &self,
        cmd: &MarkReceived,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::invariant("purchase order does not exist"));
        }
        self.ensure_order_id(cmd.order_id)?;

        // Forward-only: cannot receive before the order went out.
        if self.status != PurchaseOrderStatus::Sent {
            return Err(DomainError::invariant(
                "only sent purchase orders can be received",
            ));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderReceived(
            PurchaseOrderReceived {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
