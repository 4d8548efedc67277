//! `shelfpulse-ledger`
//!
//! **Responsibility:** Batch-granular stock for one product (FIFO-by-expiry
//! sale allocation, clamped wastage write-offs, sequence-numbered restocks),
//! plus the single shared expiry classifier.
//!
//! The `StockLedger` aggregate is the only place batch quantities change.
//! Read paths (discounts, alerts) consume batch state; they never mutate it.

pub mod expiry;
pub mod ledger;

pub use expiry::{classify, ExpiryStatus};
pub use ledger::{
    AllocateSale, Batch, BatchDeduction, BatchId, BatchReceived, LedgerCommand, LedgerEvent,
    LedgerOpened, OpenLedger, ReceiveBatch, RecordWastage, SaleAllocated, StockLedger,
    WastageRecorded,
};
