//! Forecast engine: temporal split, ensemble fit, evaluation and the
//! recursive per-group rollout.

use crate::config::ForecastConfig;
use crate::data::{GroupKey, ProductionTable};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureRow, FeatureSet, FeatureTable};
use crate::metrics::{evaluate, rank_importances, EvaluationMetrics, FeatureImportance};
use crate::models::additive::AdditiveSeasonal;
use crate::models::random_forest::{RandomForest, TrainedRandomForest};
use crate::models::{ForecastModel, Regressor, TrainedForecastModel, TrainedRegressor};
use crate::utils::{future_dates, split_index};
use chrono::NaiveDate;
use log::{debug, info, warn};
use production_math::moving_averages::HistoryBuffer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// One forecast value of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date: NaiveDate,
    pub region: String,
    pub technology: String,
    /// Never negative
    pub value: f64,
}

/// Additive model forecast with its uncertainty band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalPrediction {
    pub date: NaiveDate,
    pub region: String,
    pub technology: String,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Why a group produced no predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    TooFewRows { rows: usize, required: usize },
    Failed { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewRows { rows, required } => {
                write!(f, "{} rows, need at least {}", rows, required)
            }
            SkipReason::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub group: GroupKey,
    pub reason: SkipReason,
}

/// Sizes and boundary dates of the temporal split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
}

/// Scores one feature row. The rollout only needs this much of a model.
pub trait RowPredictor: Sync {
    fn predict_row(&self, row: &FeatureRow) -> Result<f64>;
}

/// Fitted regressor and the exact feature order it was trained on
#[derive(Debug, Clone)]
pub struct TrainedModel {
    regressor: TrainedRandomForest,
    feature_set: FeatureSet,
}

impl TrainedModel {
    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    pub fn name(&self) -> &str {
        self.regressor.name()
    }

    pub fn regressor(&self) -> &TrainedRandomForest {
        &self.regressor
    }
}

impl RowPredictor for TrainedModel {
    /// Predict a feature row through the fitted feature order
    fn predict_row(&self, row: &FeatureRow) -> Result<f64> {
        let features = self.feature_set.vectorize(row).ok_or_else(|| {
            ForecastError::ModelError(format!(
                "Row for {} on {} lacks a model input",
                row.key, row.date
            ))
        })?;
        self.regressor.predict_one(&features)
    }
}

/// Everything one forecasting run produces
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub model: TrainedModel,
    pub metrics: EvaluationMetrics,
    pub predictions: Vec<PredictionRecord>,
    pub feature_importance: Vec<FeatureImportance>,
    pub skipped_groups: Vec<SkippedGroup>,
    pub split: SplitSummary,
}

/// Output of the additive seasonal path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveOutcome {
    pub model: String,
    pub predictions: Vec<IntervalPrediction>,
    pub skipped_groups: Vec<SkippedGroup>,
}

/// Split chronologically: stable sort by date, then the first
/// `floor(n * (1 - test_fraction))` items train and the rest are held out
pub fn temporal_split<T, F>(mut items: Vec<T>, date_of: F, test_fraction: f64) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> NaiveDate,
{
    items.sort_by_key(|item| date_of(item));
    let at = split_index(items.len(), test_fraction);
    let test = items.split_off(at);
    (items, test)
}

/// Trains, evaluates and rolls forward forecasts per group
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
    feature_set: FeatureSet,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        let feature_set = FeatureSet::from_config(&config);
        Ok(Self {
            config,
            feature_set,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    /// Fit on the clean rows, score the held-out tail and forecast
    /// `horizon` periods for every group
    pub fn fit_and_evaluate(&self, table: &FeatureTable, horizon: usize) -> Result<ForecastOutcome> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be at least one period".to_string(),
            ));
        }

        let clean: Vec<(&FeatureRow, Vec<f64>)> = table
            .rows()
            .iter()
            .filter_map(|row| self.feature_set.vectorize(row).map(|v| (row, v)))
            .collect();
        let required = self.config.min_data_points;
        if clean.len() < required {
            warn!(
                "Only {} complete rows, need {} to train",
                clean.len(),
                required
            );
            return Err(ForecastError::InsufficientData {
                required,
                available: clean.len(),
            });
        }

        let available = clean.len();
        let (train, test) = temporal_split(clean, |(row, _)| row.date, self.config.test_fraction);
        let (Some(train_last), Some(test_first)) = (train.last(), test.first()) else {
            return Err(ForecastError::InsufficientData { required, available });
        };
        let split = SplitSummary {
            train_rows: train.len(),
            test_rows: test.len(),
            train_end: train_last.0.date,
            test_start: test_first.0.date,
        };
        info!(
            "Training on {} rows through {}, holding out {} rows from {}",
            split.train_rows, split.train_end, split.test_rows, split.test_start
        );

        let (train_x, train_y): (Vec<Vec<f64>>, Vec<f64>) = train
            .into_iter()
            .map(|(row, features)| (features, row.production))
            .unzip();
        let forest = RandomForest::from_config(&self.config)?;
        let regressor = forest.fit(&train_x, &train_y)?;

        let (test_x, test_y): (Vec<Vec<f64>>, Vec<f64>) = test
            .into_iter()
            .map(|(row, features)| (features, row.production))
            .unzip();
        let predicted = regressor.predict(&test_x)?;
        let metrics = evaluate(&test_y, &predicted)?;
        info!(
            "Held-out MAE {:.3}, RMSE {:.3}, R² {:.3}",
            metrics.mae, metrics.rmse, metrics.r2
        );

        let feature_importance =
            rank_importances(&self.feature_set.names(), &regressor.feature_importances())?;

        let model = TrainedModel {
            regressor,
            feature_set: self.feature_set.clone(),
        };
        let (predictions, skipped_groups) = self.rollout(&model, table, horizon);
        info!(
            "Emitted {} predictions, skipped {} groups",
            predictions.len(),
            skipped_groups.len()
        );

        Ok(ForecastOutcome {
            model,
            metrics,
            predictions,
            feature_importance,
            skipped_groups,
            split,
        })
    }

    /// Roll every group forward in parallel. Short groups and groups whose
    /// rollout fails are reported as skipped; the rest still predict.
    pub fn rollout<M: RowPredictor>(
        &self,
        model: &M,
        table: &FeatureTable,
        horizon: usize,
    ) -> (Vec<PredictionRecord>, Vec<SkippedGroup>) {
        let results: Vec<std::result::Result<Vec<PredictionRecord>, SkippedGroup>> = table
            .groups()
            .into_par_iter()
            .enumerate()
            .map(|(ordinal, (key, rows))| {
                if rows.len() < self.config.min_group_rows {
                    return Err(SkippedGroup {
                        group: key.clone(),
                        reason: SkipReason::TooFewRows {
                            rows: rows.len(),
                            required: self.config.min_group_rows,
                        },
                    });
                }
                self.rollout_group(model, rows, ordinal, horizon)
                    .map_err(|e| SkippedGroup {
                        group: key.clone(),
                        reason: SkipReason::Failed {
                            message: e.to_string(),
                        },
                    })
            })
            .collect();

        let mut predictions = Vec::new();
        let mut skipped = Vec::new();
        for result in results {
            match result {
                Ok(records) => predictions.extend(records),
                Err(group) => {
                    warn!("Skipping group {}: {}", group.group, group.reason);
                    skipped.push(group);
                }
            }
        }
        (predictions, skipped)
    }

    /// Roll one group forward `horizon` periods, feeding each prediction
    /// back as history for the next. `ordinal` seeds the optional seasonal
    /// wave noise so each group draws its own reproducible stream.
    pub fn rollout_group<M: RowPredictor>(
        &self,
        model: &M,
        rows: &[FeatureRow],
        ordinal: usize,
        horizon: usize,
    ) -> Result<Vec<PredictionRecord>> {
        let last = rows.last().ok_or_else(|| {
            ForecastError::DataError("Cannot roll out a group without rows".to_string())
        })?;

        let seed_from = rows.len().saturating_sub(self.config.seed_history);
        let seed: Vec<f64> = rows[seed_from..].iter().map(|r| r.production).collect();
        let mut history = HistoryBuffer::seeded(self.config.history_capacity, &seed)?;

        let wave = self.config.post_processing.seasonal_wave;
        let mut rng = StdRng::seed_from_u64(self.config.random_seed.wrapping_add(ordinal as u64));
        let noise = match wave {
            Some(w) if w.noise_std > 0.0 => Some(
                Normal::new(0.0, w.noise_std)
                    .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?,
            ),
            _ => None,
        };

        let mut records = Vec::with_capacity(horizon);
        for date in future_dates(last.date, horizon, self.config.cadence) {
            let mut row = last.advanced_to(date);
            for (offset, value) in row.lags.iter_mut() {
                *value = Some(history.lag(*offset).unwrap_or(0.0));
            }
            for (window, value) in row.moving_averages.iter_mut() {
                *value = history.trailing_mean(*window).unwrap_or(0.0);
            }

            let mut value = model.predict_row(&row)?;
            if let Some(w) = wave {
                let epsilon = noise.map_or(0.0, |n| n.sample(&mut rng));
                let week = row.calendar.iso_week as f64;
                value *= 1.0 + w.amplitude * (2.0 * PI * week / 52.0).sin() + epsilon;
            }
            if !value.is_finite() {
                return Err(ForecastError::ModelError(format!(
                    "Non-finite prediction for {} on {}",
                    last.key, date
                )));
            }
            let value = value.max(0.0);

            history.push(value);
            records.push(PredictionRecord {
                date,
                region: last.key.region.clone(),
                technology: last.key.technology.clone(),
                value,
            });
        }

        debug!("Rolled {} forward {} periods", last.key, records.len());
        Ok(records)
    }

    /// Fit the additive seasonal model per group; `None` when disabled
    pub fn forecast_additive(
        &self,
        table: &ProductionTable,
        horizon: usize,
    ) -> Result<Option<AdditiveOutcome>> {
        if !self.config.additive.enabled {
            info!("Additive seasonal model disabled");
            return Ok(None);
        }

        let model = AdditiveSeasonal::from_config(&self.config.additive, self.config.cadence)?;
        let required = self.config.min_data_points;

        let results: Vec<std::result::Result<Vec<IntervalPrediction>, SkippedGroup>> = table
            .group_series()
            .into_par_iter()
            .map(|series| {
                let skip = |reason| SkippedGroup {
                    group: series.key().clone(),
                    reason,
                };
                if series.len() < required {
                    return Err(skip(SkipReason::TooFewRows {
                        rows: series.len(),
                        required,
                    }));
                }

                let forecast = model
                    .train(&series)
                    .and_then(|trained| trained.forecast(horizon))
                    .map_err(|e| {
                        skip(SkipReason::Failed {
                            message: e.to_string(),
                        })
                    })?;

                let dates = forecast.dates().unwrap_or_default();
                let intervals = forecast.intervals().unwrap_or_default();
                Ok(dates
                    .iter()
                    .zip(forecast.values())
                    .zip(intervals)
                    .map(|((&date, &yhat), &(lower, upper))| IntervalPrediction {
                        date,
                        region: series.key().region.clone(),
                        technology: series.key().technology.clone(),
                        yhat,
                        yhat_lower: lower,
                        yhat_upper: upper,
                    })
                    .collect())
            })
            .collect();

        let mut predictions = Vec::new();
        let mut skipped_groups = Vec::new();
        for result in results {
            match result {
                Ok(records) => predictions.extend(records),
                Err(group) => {
                    warn!("Additive model skipped {}: {}", group.group, group.reason);
                    skipped_groups.push(group);
                }
            }
        }
        info!(
            "Additive model emitted {} predictions, skipped {} groups",
            predictions.len(),
            skipped_groups.len()
        );

        Ok(Some(AdditiveOutcome {
            model: model.name().to_string(),
            predictions,
            skipped_groups,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporal_split_keeps_order() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let items = vec![day(5), day(1), day(9), day(3), day(7)];

        let (train, test) = temporal_split(items, |d| *d, 0.4);
        assert_eq!(train, vec![day(1), day(3), day(5)]);
        assert_eq!(test, vec![day(7), day(9)]);
    }

    #[test]
    fn skip_reasons_render() {
        let reason = SkipReason::TooFewRows {
            rows: 2,
            required: 3,
        };
        assert_eq!(reason.to_string(), "2 rows, need at least 3");
    }

    #[test]
    fn engine_validates_config() {
        let config = ForecastConfig {
            n_estimators: 0,
            ..ForecastConfig::default()
        };
        assert!(ForecastEngine::new(config).is_err());
    }
}
