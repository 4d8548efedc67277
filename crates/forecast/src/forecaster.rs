use std::collections::BTreeMap;

use chrono::Month;
use serde::{Deserialize, Serialize};

use shelfpulse_core::round2;

use crate::error::ForecastError;
use crate::heuristics;
use crate::regression;

/// Number of observation rows at which a trained prediction reaches full
/// confidence.
const FULL_CONFIDENCE_ROWS: usize = 50;

/// One historical sale row: what sold, in which month, for how much.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleObservation {
    pub category: String,
    /// Calendar month 1..=12.
    pub month: u32,
    pub quantity: i64,
    pub amount: f64,
}

/// One row of a coarser, yearly-aggregated historical dataset.
///
/// Cold-start bootstrap input for when no transaction history exists yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub category: String,
    pub year: i32,
    pub units_sold: f64,
    pub revenue: f64,
}

/// A fitted per-category model plus the statistics that back its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalModel {
    /// Polynomial coefficients, lowest power first.
    coefficients: Vec<f64>,
    mean_sales: f64,
    std_sales: f64,
    data_points: usize,
}

impl SeasonalModel {
    pub fn mean_sales(&self) -> f64 {
        self.mean_sales
    }

    pub fn std_sales(&self) -> f64 {
        self.std_sales
    }

    pub fn data_points(&self) -> usize {
        self.data_points
    }

    fn confidence(&self) -> f64 {
        round2((self.data_points as f64 / FULL_CONFIDENCE_ROWS as f64).min(1.0))
    }

    fn predict(&self, month: u32) -> f64 {
        round2(regression::evaluate(&self.coefficients, month as f64).max(0.0))
    }
}

/// A demand prediction for one category and month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub category: String,
    pub month: u32,
    pub month_name: String,
    pub predicted_demand: f64,
    pub confidence: f64,
}

/// Per-category summary across all 12 months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInsight {
    pub category: String,
    pub mean_demand: f64,
    pub peak_month: String,
    pub low_month: String,
    pub peak_demand: f64,
    pub low_demand: f64,
    pub volatility: f64,
    pub data_points: usize,
    pub confidence: f64,
}

/// Per-category seasonal demand forecaster.
///
/// An explicit handle, constructed by the host and passed to callers; train
/// and reset are operations on the handle, not ambient global state. Trained
/// categories answer from their fitted polynomial; everything else falls back
/// to the heuristic table.
#[derive(Debug, Clone, Default)]
pub struct DemandForecaster {
    models: BTreeMap<String, SeasonalModel>,
}

impl DemandForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        !self.models.is_empty()
    }

    pub fn trained_categories(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn model(&self, category: &str) -> Option<&SeasonalModel> {
        self.models.get(category)
    }

    /// Drop all trained models (back to fully heuristic mode).
    pub fn reset(&mut self) {
        self.models.clear();
    }

    /// Train per-category models from monthly sale observations.
    ///
    /// Observations are aggregated by category and month (quantities summed);
    /// categories with fewer than 2 distinct months are skipped and stay in
    /// heuristic mode. Re-training replaces the stored model per category.
    ///
    /// All models are computed before any are stored, so a malformed dataset
    /// leaves the forecaster in its previous state.
    pub fn train(&mut self, observations: &[SaleObservation]) -> Result<(), ForecastError> {
        for obs in observations {
            if !(1..=12).contains(&obs.month) {
                return Err(ForecastError::InvalidObservation(format!(
                    "month {} out of range for category '{}'",
                    obs.month, obs.category
                )));
            }
            if obs.quantity < 0 {
                return Err(ForecastError::InvalidObservation(format!(
                    "negative quantity for category '{}'",
                    obs.category
                )));
            }
            if !obs.amount.is_finite() {
                return Err(ForecastError::InvalidObservation(format!(
                    "non-finite amount for category '{}'",
                    obs.category
                )));
            }
        }

        // category -> month -> summed quantity
        let mut monthly: BTreeMap<&str, BTreeMap<u32, f64>> = BTreeMap::new();
        let mut rows: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for obs in observations {
            *monthly
                .entry(obs.category.as_str())
                .or_default()
                .entry(obs.month)
                .or_insert(0.0) += obs.quantity as f64;
            rows.entry(obs.category.as_str())
                .or_default()
                .push(obs.quantity as f64);
        }

        let mut trained: Vec<(String, SeasonalModel)> = Vec::new();
        for (category, by_month) in &monthly {
            if by_month.len() < 2 {
                // Insufficient signal; heuristic mode for this category.
                continue;
            }

            let xs: Vec<f64> = by_month.keys().map(|m| *m as f64).collect();
            let ys: Vec<f64> = by_month.values().copied().collect();
            let Some(coefficients) = regression::polyfit_capped(&xs, &ys, 2) else {
                continue;
            };

            let samples = &rows[category];
            let mean_sales = regression::mean(samples);
            trained.push((
                category.to_string(),
                SeasonalModel {
                    coefficients,
                    mean_sales,
                    std_sales: regression::stddev_population(samples, mean_sales),
                    data_points: samples.len(),
                },
            ));
        }

        for (category, model) in trained {
            self.models.insert(category, model);
        }
        Ok(())
    }

    /// Bootstrap models from a yearly-aggregated historical dataset.
    ///
    /// Same fit and storage as [`train`](Self::train), on a coarser time
    /// axis: per-category yearly mean of units sold, requiring at least 3
    /// distinct years.
    pub fn train_from_dataset(&mut self, records: &[DatasetRecord]) -> Result<(), ForecastError> {
        for rec in records {
            if !(rec.units_sold.is_finite() && rec.units_sold >= 0.0) {
                return Err(ForecastError::InvalidObservation(format!(
                    "invalid units_sold for category '{}'",
                    rec.category
                )));
            }
            if !rec.revenue.is_finite() {
                return Err(ForecastError::InvalidObservation(format!(
                    "non-finite revenue for category '{}'",
                    rec.category
                )));
            }
        }

        // category -> year -> (sum, count), averaged below
        let mut yearly: BTreeMap<&str, BTreeMap<i32, (f64, usize)>> = BTreeMap::new();
        let mut rows: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for rec in records {
            let slot = yearly
                .entry(rec.category.as_str())
                .or_default()
                .entry(rec.year)
                .or_insert((0.0, 0));
            slot.0 += rec.units_sold;
            slot.1 += 1;
            rows.entry(rec.category.as_str())
                .or_default()
                .push(rec.units_sold);
        }

        let mut trained: Vec<(String, SeasonalModel)> = Vec::new();
        for (category, by_year) in &yearly {
            if by_year.len() < 3 {
                continue;
            }

            let xs: Vec<f64> = by_year.keys().map(|y| *y as f64).collect();
            let ys: Vec<f64> = by_year
                .values()
                .map(|(sum, count)| sum / *count as f64)
                .collect();
            let Some(coefficients) = regression::polyfit_capped(&xs, &ys, 2) else {
                continue;
            };

            let samples = &rows[category];
            let mean_sales = regression::mean(samples);
            trained.push((
                category.to_string(),
                SeasonalModel {
                    coefficients,
                    mean_sales,
                    std_sales: regression::stddev_population(samples, mean_sales),
                    data_points: samples.len(),
                },
            ));
        }

        for (category, model) in trained {
            self.models.insert(category, model);
        }
        Ok(())
    }

    /// Predict demand for a category in a given month.
    ///
    /// Trained categories evaluate their polynomial (floored at 0, rounded);
    /// untrained ones answer from the heuristic table at fixed medium
    /// confidence.
    pub fn predict(&self, category: &str, month: u32) -> Result<DemandForecast, ForecastError> {
        let month_name = month_name(month)?;

        let forecast = match self.models.get(category) {
            Some(model) => DemandForecast {
                category: category.to_string(),
                month,
                month_name,
                predicted_demand: model.predict(month),
                confidence: model.confidence(),
            },
            None => DemandForecast {
                category: category.to_string(),
                month,
                month_name,
                predicted_demand: heuristics::heuristic_demand(category, month),
                confidence: heuristics::HEURISTIC_CONFIDENCE,
            },
        };
        Ok(forecast)
    }

    /// Summary insights across all 12 months, for trained categories only.
    ///
    /// Empty when nothing has been trained.
    pub fn insights(&self) -> Vec<CategoryInsight> {
        self.models
            .iter()
            .map(|(category, model)| {
                let monthly: Vec<f64> = (1..=12).map(|m| model.predict(m)).collect();

                // First max/min wins on ties.
                let (peak_idx, _) = monthly
                    .iter()
                    .enumerate()
                    .fold((0, f64::MIN), |best, (i, &v)| {
                        if v > best.1 { (i, v) } else { best }
                    });
                let (low_idx, _) = monthly
                    .iter()
                    .enumerate()
                    .fold((0, f64::MAX), |best, (i, &v)| {
                        if v < best.1 { (i, v) } else { best }
                    });

                let mean = regression::mean(&monthly);
                CategoryInsight {
                    category: category.clone(),
                    mean_demand: round2(mean),
                    peak_month: month_name(peak_idx as u32 + 1).unwrap_or_default(),
                    low_month: month_name(low_idx as u32 + 1).unwrap_or_default(),
                    peak_demand: monthly[peak_idx],
                    low_demand: monthly[low_idx],
                    volatility: round2(regression::stddev_population(&monthly, mean)),
                    data_points: model.data_points,
                    confidence: model.confidence(),
                }
            })
            .collect()
    }
}

fn month_name(month: u32) -> Result<String, ForecastError> {
    let m = Month::try_from(month as u8).map_err(|_| ForecastError::InvalidMonth(month))?;
    Ok(m.name().to_string())
}
