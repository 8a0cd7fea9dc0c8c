use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use energy_forecast::data::{Observation, ProductionTable};
use energy_forecast::features::{cyclical, Feature, FeatureBuilder, FeatureSet};
use energy_forecast::ForecastConfig;
use rstest::rstest;

fn series_table(values: &[f64]) -> ProductionTable {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    ProductionTable::from_observations(
        values
            .iter()
            .enumerate()
            .map(|(i, &production)| Observation {
                date: start + Duration::weeks(i as i64),
                region: "North".to_string(),
                technology: "Solar".to_string(),
                production,
                source_row: 0,
            })
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_first_lag_is_previous_value() {
    let table = series_table(&[10.0, 20.0, 30.0]);
    let features = FeatureBuilder::new(vec![1, 2], vec![2]).unwrap().build(&table).unwrap();
    let rows = features.rows();

    assert_eq!(rows[0].lag(1), None);
    assert_eq!(rows[1].lag(1), Some(10.0));
    assert_eq!(rows[2].lag(1), Some(20.0));
    assert_eq!(rows[1].lag(2), None);
    assert_eq!(rows[2].lag(2), Some(10.0));
}

#[test]
fn test_rolling_mean_uses_available_history() {
    let table = series_table(&[4.0, 8.0, 6.0]);
    let features = FeatureBuilder::new(vec![1], vec![1, 4]).unwrap().build(&table).unwrap();

    for row in features.rows() {
        assert_eq!(row.moving_average(1), Some(row.production));
    }
    let means: Vec<f64> = features
        .rows()
        .iter()
        .filter_map(|r| r.moving_average(4))
        .collect();
    assert_eq!(means, vec![4.0, 6.0, 6.0]);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(4)]
#[case(5)]
#[case(6)]
#[case(7)]
#[case(8)]
#[case(9)]
#[case(10)]
#[case(11)]
#[case(12)]
fn test_month_encoding_lies_on_unit_circle(#[case] month: u32) {
    let (sin, cos) = cyclical(month as f64, 12.0);
    assert_abs_diff_eq!(sin * sin + cos * cos, 1.0, epsilon = 1e-12);
}

#[test]
fn test_december_and_january_are_neighbours() {
    let (s12, c12) = cyclical(12.0, 12.0);
    let (s1, c1) = cyclical(1.0, 12.0);
    let (s6, c6) = cyclical(6.0, 12.0);

    let near = ((s12 - s1).powi(2) + (c12 - c1).powi(2)).sqrt();
    let far = ((s12 - s6).powi(2) + (c12 - c6).powi(2)).sqrt();
    assert!(near < far);
}

#[test]
fn test_vectorize_requires_every_lag() {
    let table = series_table(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let config = ForecastConfig::default();
    let features = FeatureBuilder::from_config(&config).unwrap().build(&table).unwrap();
    let set = FeatureSet::from_config(&config);

    let complete: Vec<usize> = features
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| set.vectorize(row).is_some())
        .map(|(i, _)| i)
        .collect();
    // Default lags reach four periods back
    assert_eq!(complete, vec![4, 5]);
    assert_eq!(set.vectorize(&features.rows()[5]).unwrap().len(), set.len());
    assert!(set.features().contains(&Feature::Lag(4)));
}

#[test]
fn test_feature_table_frame_has_original_and_derived_columns() {
    let table = series_table(&[1.0, 2.0, 3.0]);
    let features = FeatureBuilder::new(vec![1], vec![4]).unwrap().build(&table).unwrap();
    let df = features.to_dataframe().unwrap();

    let names = df.get_column_names();
    for column in ["date", "region", "production_mwh", "month_sin", "lag_1", "ma_4"] {
        assert!(names.contains(&column), "missing column {}", column);
    }
    assert_eq!(df.height(), 3);
}
