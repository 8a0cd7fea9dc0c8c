//! Additive trend plus yearly seasonality model
//!
//! `y(t) = a + b t + Σ_k (c_k sin 2πkt + d_k cos 2πkt)` with `t` in years
//! since the first observation, fitted by least squares.

use crate::config::{AdditiveConfig, Cadence};
use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::future_dates;
use chrono::NaiveDate;
use production_math::forecasting::least_squares;
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const DAYS_PER_YEAR: f64 = 365.25;

/// Additive seasonal model
#[derive(Debug, Clone)]
pub struct AdditiveSeasonal {
    /// Name of the model
    name: String,
    fourier_order: usize,
    interval_width: f64,
    cadence: Cadence,
}

/// Trained additive seasonal model
#[derive(Debug, Clone)]
pub struct TrainedAdditiveSeasonal {
    /// Name of the model
    name: String,
    coefficients: Vec<f64>,
    fourier_order: usize,
    origin: NaiveDate,
    last_date: NaiveDate,
    cadence: Cadence,
    residual_std: f64,
    z_score: f64,
}

impl AdditiveSeasonal {
    /// Create a new additive seasonal model
    pub fn new(fourier_order: usize, interval_width: f64, cadence: Cadence) -> Result<Self> {
        if fourier_order == 0 {
            return Err(ForecastError::InvalidParameter(
                "Fourier order must be greater than zero".to_string(),
            ));
        }
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Interval width must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Additive Seasonal (order={})", fourier_order),
            fourier_order,
            interval_width,
            cadence,
        })
    }

    pub fn from_config(config: &AdditiveConfig, cadence: Cadence) -> Result<Self> {
        Self::new(config.fourier_order, config.interval_width, cadence)
    }

    /// Harmonics the series can support. Less than a full year cannot
    /// separate a yearly cycle from the trend, and each harmonic needs two
    /// coefficients with one residual degree of freedom left over.
    fn effective_order(&self, len: usize, span_years: f64) -> usize {
        if span_years < 1.0 || len < 5 {
            return 0;
        }
        self.fourier_order.min((len - 3) / 2)
    }
}

fn years_between(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64 / DAYS_PER_YEAR
}

fn design_row(t: f64, order: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + 2 * order);
    row.push(1.0);
    row.push(t);
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * t;
        row.push(angle.sin());
        row.push(angle.cos());
    }
    row
}

impl ForecastModel for AdditiveSeasonal {
    type Trained = TrainedAdditiveSeasonal;

    fn train(&self, data: &TimeSeriesData) -> Result<Self::Trained> {
        let (origin, last_date) = match (data.dates().first(), data.last_date()) {
            (Some(&first), Some(last)) if data.len() >= 3 => (first, last),
            _ => {
                return Err(ForecastError::InsufficientData {
                    required: 3,
                    available: data.len(),
                })
            }
        };

        let order = self.effective_order(data.len(), years_between(origin, last_date));
        let design: Vec<Vec<f64>> = data
            .dates()
            .iter()
            .map(|&date| design_row(years_between(origin, date), order))
            .collect();
        let coefficients = least_squares(&design, data.values())?;

        let fitted: Vec<f64> = design
            .iter()
            .map(|row| row.iter().zip(&coefficients).map(|(x, c)| x * c).sum())
            .collect();
        let sse: f64 = fitted
            .iter()
            .zip(data.values())
            .map(|(f, y)| (y - f).powi(2))
            .sum();
        let dof = data.len().saturating_sub(coefficients.len()).max(1);
        let residual_std = (sse / dof as f64).sqrt();

        let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::ModelError(e.to_string()))?;
        let z_score = normal.inverse_cdf(0.5 + self.interval_width / 2.0);

        Ok(TrainedAdditiveSeasonal {
            name: self.name.clone(),
            coefficients,
            fourier_order: order,
            origin,
            last_date,
            cadence: self.cadence,
            residual_std,
            z_score,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedAdditiveSeasonal {
    /// Harmonics actually fitted
    pub fn fourier_order(&self) -> usize {
        self.fourier_order
    }

    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }

    fn evaluate(&self, date: NaiveDate) -> f64 {
        design_row(years_between(self.origin, date), self.fourier_order)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, c)| x * c)
            .sum()
    }
}

impl TrainedForecastModel for TrainedAdditiveSeasonal {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let dates = future_dates(self.last_date, horizon, self.cadence);
        let margin = self.z_score * self.residual_std;

        let mut values = Vec::with_capacity(horizon);
        let mut intervals = Vec::with_capacity(horizon);
        for &date in &dates {
            let point = self.evaluate(date);
            if !point.is_finite() {
                return Err(ForecastError::ModelError(format!(
                    "Non-finite forecast for {}",
                    date
                )));
            }
            values.push(point.max(0.0));
            intervals.push(((point - margin).max(0.0), (point + margin).max(0.0)));
        }

        ForecastResult::new_with_intervals(values, intervals)?.with_dates(dates)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
