//! Forecasting models
//!
//! Two families live here. [`Regressor`]s learn a mapping from feature
//! vectors to production and drive the recursive rollout. [`ForecastModel`]s
//! fit a single group's dated series directly and forecast it forward.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::fmt::Debug;

/// Forecast result containing predicted values
#[derive(Debug, Clone)]
pub struct ForecastResult {
    /// Forecasted values
    values: Vec<f64>,
    /// Lower and upper bounds per value (optional)
    intervals: Option<Vec<(f64, f64)>>,
    /// Dates of the forecast periods (optional)
    dates: Option<Vec<NaiveDate>>,
}

impl ForecastResult {
    /// Create a new forecast result with uncertainty bounds
    pub fn new_with_intervals(values: Vec<f64>, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if values.len() != intervals.len() {
            return Err(ForecastError::ModelError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        Ok(Self {
            values,
            intervals: Some(intervals),
            dates: None,
        })
    }

    /// Attach the forecast dates
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.len() != self.values.len() {
            return Err(ForecastError::ModelError(format!(
                "Values length ({}) doesn't match dates length ({})",
                self.values.len(),
                dates.len()
            )));
        }
        self.dates = Some(dates);
        Ok(self)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    /// Get the uncertainty bounds, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Get the forecast dates, if available
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }
}

/// Trained series model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for future periods
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Series model that can be trained on one group's dated values
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on time series data
    fn train(&self, data: &TimeSeriesData) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Fitted feature-vector regressor; shared read-only across rollouts
pub trait TrainedRegressor: Debug + Send + Sync {
    /// Predict one feature vector
    fn predict_one(&self, features: &[f64]) -> Result<f64>;

    /// Predict many feature vectors
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Contribution of each input, in input order, summing to one
    fn feature_importances(&self) -> Vec<f64>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Regressor over fixed-width feature vectors
pub trait Regressor: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedRegressor;

    /// Fit on row-major `features` against `targets`
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod additive;
pub mod decision_tree;
pub mod random_forest;
