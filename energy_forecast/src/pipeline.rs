//! End-to-end run: describe, build features, forecast, compare

use crate::analysis::{analyze, DescriptiveAnalysis};
use crate::config::{Cadence, ForecastConfig};
use crate::data::{DataLoader, ProductionTable};
use crate::error::Result;
use crate::features::{FeatureBuilder, FeatureTable};
use crate::forecast::{
    AdditiveOutcome, ForecastEngine, ForecastOutcome, PredictionRecord, SkippedGroup,
    SplitSummary,
};
use crate::insights::{executive_summary, ComparativeInsights};
use crate::metrics::{EvaluationMetrics, FeatureImportance, ForecastReport};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;

/// Serialisable part of an ensemble forecasting run
#[derive(Debug, Clone, Serialize)]
pub struct EnsembleSection {
    pub model: String,
    pub metrics: EvaluationMetrics,
    pub feature_importance: Vec<FeatureImportance>,
    pub skipped_groups: Vec<SkippedGroup>,
    pub split: SplitSummary,
    pub prediction_count: usize,
    #[serde(skip)]
    pub predictions: Vec<PredictionRecord>,
}

impl From<ForecastOutcome> for EnsembleSection {
    fn from(outcome: ForecastOutcome) -> Self {
        Self {
            model: outcome.model.name().to_string(),
            metrics: outcome.metrics,
            feature_importance: outcome.feature_importance,
            skipped_groups: outcome.skipped_groups,
            split: outcome.split,
            prediction_count: outcome.predictions.len(),
            predictions: outcome.predictions,
        }
    }
}

impl EnsembleSection {
    pub fn report(&self) -> ForecastReport {
        ForecastReport {
            model: self.model.clone(),
            metrics: self.metrics,
            importances: self.feature_importance.clone(),
            skipped: self.skipped_groups.clone(),
            predictions: self.predictions.len(),
        }
    }
}

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct OutlookReport {
    pub horizon: usize,
    pub cadence: Cadence,
    pub analysis: DescriptiveAnalysis,
    /// Absent when there was too little data to train
    pub ensemble: Option<EnsembleSection>,
    pub additive: Option<AdditiveOutcome>,
    pub insights: ComparativeInsights,
    #[serde(skip)]
    pub feature_table: FeatureTable,
}

impl OutlookReport {
    pub fn predictions(&self) -> &[PredictionRecord] {
        self.ensemble
            .as_ref()
            .map(|e| e.predictions.as_slice())
            .unwrap_or_default()
    }

    /// True when only the descriptive part could be produced
    pub fn is_description_only(&self) -> bool {
        self.ensemble.is_none()
    }

    pub fn executive_summary(&self) -> String {
        executive_summary(&self.analysis, &self.insights)
    }
}

/// Runs the full outlook for one table
#[derive(Debug, Clone)]
pub struct OutlookPipeline {
    builder: FeatureBuilder,
    engine: ForecastEngine,
}

impl OutlookPipeline {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        let builder = FeatureBuilder::from_config(&config)?;
        let engine = ForecastEngine::new(config)?;
        Ok(Self { builder, engine })
    }

    pub fn config(&self) -> &ForecastConfig {
        self.engine.config()
    }

    /// Load a CSV file and run on it
    pub fn run_csv<P: AsRef<Path>>(&self, path: P, horizon: usize) -> Result<OutlookReport> {
        let table = DataLoader::from_csv(path)?;
        self.run(&table, horizon)
    }

    /// Describe the table and forecast `horizon` periods per group. Too
    /// little data for training degrades to a description-only report;
    /// any other failure is returned.
    pub fn run(&self, table: &ProductionTable, horizon: usize) -> Result<OutlookReport> {
        info!(
            "Running outlook over {} records, horizon {} {} periods",
            table.len(),
            horizon,
            self.config().cadence.label()
        );
        let analysis = analyze(table)?;
        let feature_table = self.builder.build(table)?;

        let ensemble = match self.engine.fit_and_evaluate(&feature_table, horizon) {
            Ok(outcome) => Some(EnsembleSection::from(outcome)),
            Err(e) if e.is_insufficient_data() => {
                warn!("Skipping the ensemble forecast: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let additive = match self.engine.forecast_additive(table, horizon) {
            Ok(outcome) => outcome,
            Err(e) if e.is_insufficient_data() => {
                warn!("Skipping the additive forecast: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let insights = ComparativeInsights::build(
            table,
            &analysis.breakdown,
            ensemble.as_ref().map(|e| e.predictions.as_slice()),
            additive.as_ref().map(|a| a.predictions.as_slice()),
            ensemble.as_ref().map(|e| &e.metrics),
        );

        Ok(OutlookReport {
            horizon,
            cadence: self.config().cadence,
            analysis,
            ensemble,
            additive,
            insights,
            feature_table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use chrono::{Duration, NaiveDate};

    fn weekly_table(weeks: usize) -> ProductionTable {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut observations = Vec::new();
        for (region, base) in [("North", 100.0), ("South", 60.0)] {
            for w in 0..weeks {
                observations.push(Observation {
                    date: start + Duration::weeks(w as i64),
                    region: region.to_string(),
                    technology: "Solar".to_string(),
                    production: base + (w % 5) as f64,
                    source_row: 0,
                });
            }
        }
        ProductionTable::from_observations(observations).unwrap()
    }

    fn small_config() -> ForecastConfig {
        ForecastConfig {
            n_estimators: 10,
            ..ForecastConfig::default()
        }
    }

    #[test]
    fn full_run_produces_every_section() {
        let pipeline = OutlookPipeline::new(small_config()).unwrap();
        let report = pipeline.run(&weekly_table(30), 4).unwrap();

        assert!(!report.is_description_only());
        assert_eq!(report.predictions().len(), 8);
        assert!(report.predictions().iter().all(|p| p.value >= 0.0));
        assert!(report.insights.ensemble.is_some());
        assert_eq!(report.feature_table.len(), 60);
        assert!(report.executive_summary().contains("Recommendations:"));
    }

    #[test]
    fn tiny_table_degrades_to_description() {
        let pipeline = OutlookPipeline::new(small_config()).unwrap();
        let report = pipeline.run(&weekly_table(2), 4).unwrap();

        assert!(report.is_description_only());
        assert!(report.predictions().is_empty());
        assert_eq!(report.analysis.summary.rows, 4);
        assert!(report.insights.confidence.is_none());
    }

    #[test]
    fn zero_horizon_is_an_error() {
        let pipeline = OutlookPipeline::new(small_config()).unwrap();
        assert!(pipeline.run(&weekly_table(30), 0).is_err());
    }
}
