//! Command execution pipeline (application-level orchestration).
//!
//! One consistent lifecycle for every aggregate:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (per-stream)
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//! ```
//!
//! The append carries `ExpectedVersion::Exact(version-at-load)`, so two
//! dispatches racing on the same stream cannot both commit: the loser gets a
//! `Concurrency` error and no partial effect. Combined with pure `handle`,
//! this is what makes ledger allocations all-or-nothing under contention.
//!
//! This module contains no IO itself; it composes the `EventStore` trait.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use shelfpulse_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use shelfpulse_events::{Event, EventEnvelope};
use thiserror::Error;

use crate::event_store::{EventStore, EventStoreError, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Deterministic domain rejection (validation, invariants, not-found,
    /// insufficient stock).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Optimistic concurrency failure (e.g. stale aggregate version).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// Failed to deserialize historical event payloads into the aggregate
    /// event type.
    #[error("failed to deserialize stream: {0}")]
    Deserialize(String),

    /// Persisting to the event store failed.
    #[error("event store failure: {0}")]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::Deserialize(msg) => DispatchError::Deserialize(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// Rehydrate-handle-append pipeline over an event store.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Rebuild an aggregate's current state from its stream.
    pub fn load<A>(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        empty: impl FnOnce() -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: Event + DeserializeOwned,
    {
        let stream = self.store.load_stream(aggregate_type, aggregate_id)?;
        let mut aggregate = empty();
        for stored in &stream {
            let event: A::Event = stored.decode()?;
            aggregate.apply(&event);
        }
        Ok(aggregate)
    }

    /// Execute one command against one aggregate stream.
    ///
    /// Returns the aggregate state after the new events, plus the committed
    /// envelopes for projection feeding.
    pub fn execute<A>(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        empty: impl FnOnce() -> A,
        command: &A::Command,
    ) -> Result<(A, Vec<EventEnvelope<JsonValue>>), DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let mut aggregate = self.load(aggregate_type, aggregate_id, empty)?;
        let loaded_version = aggregate.version();

        let events = aggregate.handle(command).map_err(DispatchError::Domain)?;
        if events.is_empty() {
            return Ok((aggregate, vec![]));
        }

        let mut uncommitted = Vec::with_capacity(events.len());
        for event in &events {
            uncommitted.push(UncommittedEvent::from_typed(
                aggregate_id,
                aggregate_type,
                event,
            )?);
        }

        let stored = self
            .store
            .append(uncommitted, ExpectedVersion::Exact(loaded_version))?;

        for event in &events {
            aggregate.apply(event);
        }

        Ok((aggregate, stored.iter().map(|s| s.to_envelope()).collect()))
    }
}
