use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use shelfpulse_core::AggregateId;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonic { last: u64, found: u64 },
}

/// Per-stream sequence cursors for idempotent projections.
///
/// Supports at-least-once delivery: replays at or below the cursor are
/// reported as duplicates, gaps and zero sequence numbers are rejected.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<AggregateId, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a (stream, sequence) pair.
    ///
    /// Returns `Ok(true)` when the event is new (cursor advanced) and
    /// `Ok(false)` for a duplicate/replay that is safe to ignore. The first
    /// event of a stream may carry any positive sequence; after that strict
    /// +1 increments are enforced.
    pub fn observe(&self, aggregate_id: AggregateId, sequence: u64) -> Result<bool, CursorError> {
        let mut cursors = match self.inner.write() {
            Ok(guard) => guard,
            Err(_) => return Ok(false),
        };
        let last = *cursors.get(&aggregate_id).unwrap_or(&0);

        if sequence == 0 {
            return Err(CursorError::NonMonotonic {
                last,
                found: sequence,
            });
        }
        if sequence <= last {
            return Ok(false);
        }
        if last != 0 && sequence != last + 1 {
            return Err(CursorError::NonMonotonic {
                last,
                found: sequence,
            });
        }

        cursors.insert(aggregate_id, sequence);
        Ok(true)
    }
}
