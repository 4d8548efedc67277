//! `shelfpulse-forecast`
//!
//! **Responsibility:** Per-category seasonal demand forecasting.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not depend on ledger/catalog aggregates.
//! - It must not mutate domain state.
//! - Inputs are plain observation rows supplied by callers (infra/workers).
//!
//! Two tiers, not an error path: categories with enough history get a fitted
//! degree-2 polynomial model; everything else answers from a fixed seasonal
//! heuristic table at medium confidence.

pub mod error;
pub mod forecaster;
pub mod heuristics;
pub mod regression;

pub use error::ForecastError;
pub use forecaster::{
    CategoryInsight, DatasetRecord, DemandForecast, DemandForecaster, SaleObservation,
    SeasonalModel,
};
pub use heuristics::{BASE_DEMAND, HEURISTIC_CONFIDENCE};
