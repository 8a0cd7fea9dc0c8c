use chrono::{Duration, NaiveDate};
use energy_forecast::analysis::Level;
use energy_forecast::export::{
    export_all, ADDITIVE_PREDICTIONS_FILE, FEATURE_TABLE_FILE, IMPORTANCE_FILE, METRICS_FILE,
    PREDICTIONS_FILE, REPORT_FILE, SUMMARY_FILE,
};
use energy_forecast::{ForecastConfig, OutlookPipeline};
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

// Two regions by two technologies with a steady upward drift
fn create_sample_data(weeks: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,region,technology,production_mwh,capacity_mw").unwrap();

    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    for week in 0..weeks {
        let date = start + Duration::weeks(week as i64);
        for (region, scale) in [("North", 3.0), ("South", 1.0)] {
            for (technology, base) in [("Solar", 50.0), ("Wind", 30.0)] {
                let seasonal = 10.0 * (2.0 * std::f64::consts::PI * week as f64 / 52.0).cos();
                let value = scale * (base + seasonal) + 0.5 * week as f64;
                writeln!(file, "{},{},{},{:.3},{}", date, region, technology, value, 100).unwrap();
            }
        }
    }
    file
}

fn config() -> ForecastConfig {
    ForecastConfig {
        n_estimators: 15,
        ..ForecastConfig::default()
    }
}

#[test]
fn test_full_outlook_workflow() {
    let data = create_sample_data(60);
    let pipeline = OutlookPipeline::new(config()).unwrap();
    let report = pipeline.run_csv(data.path(), 8).unwrap();

    // Description
    let summary = &report.analysis.summary;
    assert_eq!(summary.rows, 240);
    assert_eq!(summary.columns, 5);
    assert_eq!(summary.duplicate_rows, 0);
    assert_eq!(
        report.analysis.breakdown.leading_region.as_ref().unwrap().name,
        "North"
    );
    assert_eq!(
        report.analysis.breakdown.leading_technology.as_ref().unwrap().name,
        "Solar"
    );
    assert_eq!(report.analysis.risk.concentration[0].level, Level::High);
    let growth = report.analysis.temporal.growth.as_ref().unwrap();
    assert!(growth.rate > 0.0);

    // Forecast
    assert!(!report.is_description_only());
    assert_eq!(report.predictions().len(), 32);
    assert!(report.predictions().iter().all(|p| p.value >= 0.0));
    assert_eq!(report.additive.as_ref().unwrap().predictions.len(), 32);

    // Insights
    assert!(report.insights.ensemble.is_some());
    assert!(report.insights.confidence.is_some());
    assert_eq!(
        report.insights.recommendations.last().unwrap(),
        "Implement continuous predictive monitoring"
    );
}

#[test]
fn test_export_writes_every_file() {
    let data = create_sample_data(30);
    let pipeline = OutlookPipeline::new(config()).unwrap();
    let report = pipeline.run_csv(data.path(), 4).unwrap();

    let dir = tempdir().unwrap();
    let out = dir.path().join("outlook");
    let written = export_all(&out, &report).unwrap();
    assert_eq!(written.len(), 7);

    for name in [
        PREDICTIONS_FILE,
        ADDITIVE_PREDICTIONS_FILE,
        METRICS_FILE,
        IMPORTANCE_FILE,
        FEATURE_TABLE_FILE,
        REPORT_FILE,
        SUMMARY_FILE,
    ] {
        assert!(out.join(name).exists(), "{} was not written", name);
    }

    let predictions = fs::read_to_string(out.join(PREDICTIONS_FILE)).unwrap();
    // Header plus 4 groups by 4 weeks
    assert_eq!(predictions.lines().count(), 17);

    let features = fs::read_to_string(out.join(FEATURE_TABLE_FILE)).unwrap();
    let header = features.lines().next().unwrap();
    assert!(header.contains("capacity_mw"));
    assert!(header.contains("lag_1"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(json["horizon"], 4);
    assert!(json["analysis"]["summary"]["rows"].is_number());
    assert!(json["ensemble"]["metrics"]["mae"].is_number());
}

#[test]
fn test_small_input_degrades_to_description_only() {
    let data = create_sample_data(3);
    let pipeline = OutlookPipeline::new(config()).unwrap();
    let report = pipeline.run_csv(data.path(), 4).unwrap();

    assert!(report.is_description_only());
    assert!(report.predictions().is_empty());
    assert_eq!(report.analysis.summary.rows, 12);

    let dir = tempdir().unwrap();
    let written = export_all(dir.path(), &report).unwrap();
    assert!(!dir.path().join(PREDICTIONS_FILE).exists());
    assert!(dir.path().join(SUMMARY_FILE).exists());
    assert!(written.iter().any(|p| p.ends_with(REPORT_FILE)));
}

#[test]
fn test_config_file_round_trip() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"n_estimators": 12, "cadence": "daily", "additive": {{"enabled": false}}}}"#
    )
    .unwrap();

    let config = ForecastConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.n_estimators, 12);
    assert_eq!(config.max_depth, 8);
    assert!(!config.additive.enabled);
    assert_eq!(config.additive.fourier_order, 3);

    let pipeline = OutlookPipeline::new(config).unwrap();
    let report = pipeline.run_csv(create_sample_data(20).path(), 3).unwrap();
    assert!(report.additive.is_none());
    let first = report.predictions()[0].date;
    let last_seen = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap() + Duration::weeks(19);
    assert_eq!(first, last_seen + Duration::days(1));
}
