//! Read-model projections fed from committed event envelopes.
//!
//! Projections are disposable: every one of them can be rebuilt by replaying
//! the event streams. Each is cursor-guarded per stream, so feeding the same
//! envelope twice (at-least-once delivery, replays) is a no-op.

pub mod catalog;
pub mod cursor;
pub mod purchase_orders;
pub mod suppliers;
pub mod transactions;

pub use catalog::{ProductCatalogProjection, ProductReadModel};
pub use cursor::{CursorError, StreamCursors};
pub use purchase_orders::{PurchaseOrderReadModel, PurchaseOrdersProjection};
pub use suppliers::{SupplierDirectoryProjection, SupplierReadModel};
pub use transactions::{TransactionKind, TransactionLogProjection, TransactionRecord};
