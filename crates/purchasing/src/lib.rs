//! `shelfpulse-purchasing`
//!
//! **Responsibility:** Auto-drafted purchase orders and the replenishment
//! policy that proposes them. The `PurchaseOrder` aggregate is the
//! draft/sent/received state machine; `replenish::evaluate` is the pure
//! stock-out projection (velocity, urgency, order sizing). Wiring the two
//! together after a sale, including de-duplication and supplier lookup, is
//! the infra layer's job.

pub mod order;
pub mod replenish;

pub use order::{
    DraftOrder, MarkReceived, MarkSent, PurchaseOrder, PurchaseOrderCommand,
    PurchaseOrderDrafted, PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderReceived,
    PurchaseOrderSent, PurchaseOrderStatus,
};
pub use replenish::{
    evaluate, OrderProposal, ReplenishmentInputs, COVER_DAYS, MIN_ORDER_QUANTITY, MIN_VELOCITY,
    URGENCY_WINDOW_DAYS,
};
