//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastOutcome, SkippedGroup};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accuracy on the held-out tail
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Mean Absolute Percentage Error over non-zero truths; `None` when
    /// every truth is zero
    pub mape: Option<f64>,
    /// Rows evaluated
    pub test_rows: usize,
}

/// Evaluate predictions against actual values
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<EvaluationMetrics> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::DataError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;

    let mean = actual.iter().sum::<f64>() / n;
    let ss_total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_residual: f64 = errors.iter().map(|e| e.powi(2)).sum();
    // Constant truth: perfect predictions score 1, anything else 0
    let r2 = if ss_total.abs() < 1e-12 {
        if ss_residual.abs() < 1e-12 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_residual / ss_total
    };

    let percentage: Vec<f64> = actual
        .iter()
        .zip(&errors)
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e / a).abs() * 100.0)
        .collect();
    let mape = if percentage.is_empty() {
        None
    } else {
        Some(percentage.iter().sum::<f64>() / percentage.len() as f64)
    };

    Ok(EvaluationMetrics {
        mae,
        rmse: mse.sqrt(),
        r2,
        mape,
        test_rows: actual.len(),
    })
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics ({} held-out rows):", self.test_rows)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  R²:    {:.4}", self.r2)?;
        match self.mape {
            Some(mape) => writeln!(f, "  MAPE:  {:.2}%", mape),
            None => writeln!(f, "  MAPE:  undefined"),
        }
    }
}

/// One input's share of the model's total importance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pair names with scores and sort descending; ties keep input order
pub fn rank_importances(names: &[String], scores: &[f64]) -> Result<Vec<FeatureImportance>> {
    if names.len() != scores.len() {
        return Err(ForecastError::ModelError(format!(
            "{} feature names but {} importance scores",
            names.len(),
            scores.len()
        )));
    }

    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(scores)
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranked)
}

/// Metrics, ranked importances and skipped groups of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub model: String,
    pub metrics: EvaluationMetrics,
    pub importances: Vec<FeatureImportance>,
    pub skipped: Vec<SkippedGroup>,
    pub predictions: usize,
}

impl ForecastReport {
    pub fn from_outcome(outcome: &ForecastOutcome) -> Self {
        Self {
            model: outcome.model.name().to_string(),
            metrics: outcome.metrics,
            importances: outcome.feature_importance.clone(),
            skipped: outcome.skipped_groups.clone(),
            predictions: outcome.predictions.len(),
        }
    }
}

impl fmt::Display for ForecastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.model)?;
        write!(f, "{}", self.metrics)?;
        writeln!(f, "Feature Importance:")?;
        for (rank, item) in self.importances.iter().enumerate() {
            writeln!(
                f,
                "  {:>2}. {:<16} {:.4}",
                rank + 1,
                item.feature,
                item.importance
            )?;
        }
        writeln!(f, "Predictions: {}", self.predictions)?;
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped groups:")?;
            for skipped in &self.skipped {
                writeln!(f, "  {}: {}", skipped.group, skipped.reason)?;
            }
        }
        Ok(())
    }
}
