use thiserror::Error;

/// Forecasting failures.
///
/// Training errors are deliberately recoverable: callers log them and keep
/// the forecaster in its previous state.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("invalid month: {0} (expected 1..=12)")]
    InvalidMonth(u32),
}
