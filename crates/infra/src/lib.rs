//! Infrastructure layer: event store, dispatch pipeline, read models, and the
//! post-sale replenishment wiring.
//!
//! Persistence technology is an external collaborator; everything here ships
//! with in-memory implementations behind the same traits a persistent backend
//! would implement.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod replenishment;
pub mod service;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use read_model::{InMemoryReadStore, ReadStore};
pub use service::{ProductExpiryAlert, StockAlert, StoreService};
