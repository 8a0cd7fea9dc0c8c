//! Writes run outputs to a directory

use crate::error::Result;
use crate::features::FeatureTable;
use crate::forecast::{IntervalPrediction, PredictionRecord};
use crate::metrics::{EvaluationMetrics, FeatureImportance};
use crate::pipeline::OutlookReport;
use chrono::NaiveDate;
use log::info;
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const PREDICTIONS_FILE: &str = "predictions_ml.csv";
pub const ADDITIVE_PREDICTIONS_FILE: &str = "predictions_additive.csv";
pub const METRICS_FILE: &str = "model_metrics.csv";
pub const IMPORTANCE_FILE: &str = "feature_importance.csv";
pub const FEATURE_TABLE_FILE: &str = "feature_table.csv";
pub const REPORT_FILE: &str = "outlook_report.json";
pub const SUMMARY_FILE: &str = "executive_summary.txt";

#[derive(Serialize)]
struct PredictionRow<'a> {
    date: NaiveDate,
    region: &'a str,
    technology: &'a str,
    predicted_mwh: f64,
}

#[derive(Serialize)]
struct MetricsRow<'a> {
    model: &'a str,
    mae: f64,
    rmse: f64,
    r2: f64,
    mape: Option<f64>,
    test_rows: usize,
}

pub fn write_predictions(path: &Path, predictions: &[PredictionRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for p in predictions {
        writer.serialize(PredictionRow {
            date: p.date,
            region: &p.region,
            technology: &p.technology,
            predicted_mwh: p.value,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_interval_predictions(path: &Path, predictions: &[IntervalPrediction]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for p in predictions {
        writer.serialize(p)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_metrics(path: &Path, model: &str, metrics: &EvaluationMetrics) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.serialize(MetricsRow {
        model,
        mae: metrics.mae,
        rmse: metrics.rmse,
        r2: metrics.r2,
        mape: metrics.mape,
        test_rows: metrics.test_rows,
    })?;
    writer.flush()?;
    Ok(())
}

pub fn write_importances(path: &Path, importances: &[FeatureImportance]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for item in importances {
        writer.serialize(item)?;
    }
    writer.flush()?;
    Ok(())
}

/// Original columns followed by every derived feature
pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<()> {
    let mut df = table.to_dataframe()?;
    CsvWriter::new(File::create(path)?)
        .has_header(true)
        .finish(&mut df)?;
    Ok(())
}

pub fn write_report_json(path: &Path, report: &OutlookReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write every output of `report` into `dir`, creating it if needed.
/// Returns the written paths; forecast files are only written when the
/// corresponding forecast exists.
pub fn export_all(dir: &Path, report: &OutlookReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if let Some(ensemble) = &report.ensemble {
        let path = dir.join(PREDICTIONS_FILE);
        write_predictions(&path, &ensemble.predictions)?;
        written.push(path);

        let path = dir.join(METRICS_FILE);
        write_metrics(&path, &ensemble.model, &ensemble.metrics)?;
        written.push(path);

        let path = dir.join(IMPORTANCE_FILE);
        write_importances(&path, &ensemble.feature_importance)?;
        written.push(path);
    }

    if let Some(additive) = &report.additive {
        let path = dir.join(ADDITIVE_PREDICTIONS_FILE);
        write_interval_predictions(&path, &additive.predictions)?;
        written.push(path);
    }

    let path = dir.join(FEATURE_TABLE_FILE);
    write_feature_table(&path, &report.feature_table)?;
    written.push(path);

    let path = dir.join(REPORT_FILE);
    write_report_json(&path, report)?;
    written.push(path);

    let path = dir.join(SUMMARY_FILE);
    fs::write(&path, report.executive_summary())?;
    written.push(path);

    info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
