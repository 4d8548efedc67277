pub mod active_index;
pub mod engine;

pub use active_index::ActiveOrderIndex;
pub use engine::ReplenishmentEngine;
