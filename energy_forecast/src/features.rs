//! Feature engineering for production records
//!
//! Turns a [`ProductionTable`] into typed [`FeatureRow`]s: calendar fields,
//! cyclical encodings, categorical codes and per-group lag and moving
//! average features. The ordered [`FeatureSet`] decides which of those a
//! model consumes and in what column order.

use crate::config::ForecastConfig;
use crate::data::{GroupKey, ProductionTable};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use log::info;
use polars::prelude::*;
use production_math::moving_averages::{lagged, rolling_mean};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

/// Sine and cosine of `value` on a cycle of length `period`
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Calendar decomposition of a date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub iso_week: u32,
    pub day_of_year: u32,
    pub month_sin: f64,
    pub month_cos: f64,
    pub week_sin: f64,
    pub week_cos: f64,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        let iso_week = date.iso_week().week();
        let (month_sin, month_cos) = cyclical(month as f64, 12.0);
        let (week_sin, week_cos) = cyclical(iso_week as f64, 52.0);

        Self {
            year: date.year(),
            month,
            quarter: (month - 1) / 3 + 1,
            iso_week,
            day_of_year: date.ordinal(),
            month_sin,
            month_cos,
            week_sin,
            week_cos,
        }
    }
}

/// A single model input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    RegionCode,
    TechnologyCode,
    Year,
    Month,
    Quarter,
    IsoWeek,
    DayOfYear,
    MonthSin,
    MonthCos,
    WeekSin,
    WeekCos,
    Lag(usize),
    MovingAverage(usize),
}

impl Feature {
    /// Column name used in exported tables and reports
    pub fn name(&self) -> String {
        match self {
            Feature::RegionCode => "region_code".to_string(),
            Feature::TechnologyCode => "technology_code".to_string(),
            Feature::Year => "year".to_string(),
            Feature::Month => "month".to_string(),
            Feature::Quarter => "quarter".to_string(),
            Feature::IsoWeek => "iso_week".to_string(),
            Feature::DayOfYear => "day_of_year".to_string(),
            Feature::MonthSin => "month_sin".to_string(),
            Feature::MonthCos => "month_cos".to_string(),
            Feature::WeekSin => "week_sin".to_string(),
            Feature::WeekCos => "week_cos".to_string(),
            Feature::Lag(offset) => format!("lag_{}", offset),
            Feature::MovingAverage(window) => format!("ma_{}", window),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Ordered model inputs. The trained model keeps the set it was fitted
/// with, and every prediction vectorises rows through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        if features.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Feature set must contain at least one feature".to_string(),
            ));
        }
        Ok(Self { features })
    }

    /// Codes, seasonal calendar fields, cyclical encodings, then the
    /// configured lags and moving averages
    pub fn from_config(config: &ForecastConfig) -> Self {
        let mut features = vec![
            Feature::RegionCode,
            Feature::TechnologyCode,
            Feature::Month,
            Feature::Quarter,
            Feature::IsoWeek,
            Feature::MonthSin,
            Feature::MonthCos,
            Feature::WeekSin,
            Feature::WeekCos,
        ];
        features.extend(config.lags.iter().map(|&lag| Feature::Lag(lag)));
        features.extend(
            config
                .rolling_windows
                .iter()
                .map(|&window| Feature::MovingAverage(window)),
        );
        Self { features }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(Feature::name).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Row values in set order; `None` if any input is unavailable
    pub fn vectorize(&self, row: &FeatureRow) -> Option<Vec<f64>> {
        self.features.iter().map(|&f| row.value(f)).collect()
    }
}

/// Sorted distinct labels with stable integer codes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryIndex {
    labels: Vec<String>,
}

impl CategoryIndex {
    pub fn from_labels<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> Self {
        let unique: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            labels: unique.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    pub fn label(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Every derived attribute of one observation
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub key: GroupKey,
    pub date: NaiveDate,
    pub production: f64,
    pub region_code: usize,
    pub technology_code: usize,
    pub calendar: CalendarFeatures,
    /// `(offset, value)`; `None` where the group has no value that far back
    pub lags: Vec<(usize, Option<f64>)>,
    /// `(window, trailing mean)`
    pub moving_averages: Vec<(usize, f64)>,
    pub source_row: usize,
}

impl FeatureRow {
    pub fn lag(&self, offset: usize) -> Option<f64> {
        self.lags
            .iter()
            .find(|(o, _)| *o == offset)
            .and_then(|(_, value)| *value)
    }

    pub fn moving_average(&self, window: usize) -> Option<f64> {
        self.moving_averages
            .iter()
            .find(|(w, _)| *w == window)
            .map(|(_, value)| *value)
    }

    /// Numeric value of `feature`, `None` when unavailable
    pub fn value(&self, feature: Feature) -> Option<f64> {
        let c = &self.calendar;
        match feature {
            Feature::RegionCode => Some(self.region_code as f64),
            Feature::TechnologyCode => Some(self.technology_code as f64),
            Feature::Year => Some(c.year as f64),
            Feature::Month => Some(c.month as f64),
            Feature::Quarter => Some(c.quarter as f64),
            Feature::IsoWeek => Some(c.iso_week as f64),
            Feature::DayOfYear => Some(c.day_of_year as f64),
            Feature::MonthSin => Some(c.month_sin),
            Feature::MonthCos => Some(c.month_cos),
            Feature::WeekSin => Some(c.week_sin),
            Feature::WeekCos => Some(c.week_cos),
            Feature::Lag(offset) => self.lag(offset),
            Feature::MovingAverage(window) => self.moving_average(window),
        }
    }

    /// Copy of this row moved to `date`, calendar fields recomputed
    pub fn advanced_to(&self, date: NaiveDate) -> Self {
        Self {
            date,
            calendar: CalendarFeatures::from_date(date),
            ..self.clone()
        }
    }
}

/// Builds feature tables with a fixed lag and window configuration
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    lags: Vec<usize>,
    rolling_windows: Vec<usize>,
}

impl FeatureBuilder {
    pub fn new(lags: Vec<usize>, rolling_windows: Vec<usize>) -> Result<Self> {
        if lags.iter().chain(&rolling_windows).any(|&v| v == 0) {
            return Err(ForecastError::InvalidParameter(
                "Lag offsets and rolling windows must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            lags,
            rolling_windows,
        })
    }

    pub fn from_config(config: &ForecastConfig) -> Result<Self> {
        Self::new(config.lags.clone(), config.rolling_windows.clone())
    }

    /// Derive every feature row, sorted by (region, technology, date)
    pub fn build(&self, table: &ProductionTable) -> Result<FeatureTable> {
        let regions =
            CategoryIndex::from_labels(table.observations().iter().map(|o| o.region.as_str()));
        let technologies = CategoryIndex::from_labels(
            table.observations().iter().map(|o| o.technology.as_str()),
        );

        let mut rows = Vec::with_capacity(table.len());
        for (key, observations) in table.groups() {
            let region_code = regions.code(&key.region).ok_or_else(|| {
                ForecastError::DataError(format!("Unindexed region '{}'", key.region))
            })?;
            let technology_code = technologies.code(&key.technology).ok_or_else(|| {
                ForecastError::DataError(format!("Unindexed technology '{}'", key.technology))
            })?;

            let values: Vec<f64> = observations.iter().map(|o| o.production).collect();
            let lag_columns: Vec<Vec<Option<f64>>> =
                self.lags.iter().map(|&lag| lagged(&values, lag)).collect();
            let mean_columns = self
                .rolling_windows
                .iter()
                .map(|&window| rolling_mean(&values, window))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for (i, observation) in observations.iter().enumerate() {
                rows.push(FeatureRow {
                    key: key.clone(),
                    date: observation.date,
                    production: observation.production,
                    region_code,
                    technology_code,
                    calendar: CalendarFeatures::from_date(observation.date),
                    lags: self
                        .lags
                        .iter()
                        .zip(&lag_columns)
                        .map(|(&lag, column)| (lag, column[i]))
                        .collect(),
                    moving_averages: self
                        .rolling_windows
                        .iter()
                        .zip(&mean_columns)
                        .map(|(&window, column)| (window, column[i]))
                        .collect(),
                    source_row: observation.source_row,
                });
            }
        }

        info!(
            "Built {} feature rows for {} regions and {} technologies",
            rows.len(),
            regions.len(),
            technologies.len()
        );

        Ok(FeatureTable {
            rows,
            regions,
            technologies,
            lags: self.lags.clone(),
            rolling_windows: self.rolling_windows.clone(),
            source: table.source().clone(),
        })
    }
}

/// Feature rows of a whole table plus the category indices behind them
#[derive(Debug, Clone)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
    regions: CategoryIndex,
    technologies: CategoryIndex,
    lags: Vec<usize>,
    rolling_windows: Vec<usize>,
    source: DataFrame,
}

impl FeatureTable {
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn regions(&self) -> &CategoryIndex {
        &self.regions
    }

    pub fn technologies(&self) -> &CategoryIndex {
        &self.technologies
    }

    /// Contiguous row slices per group, in key order
    pub fn groups(&self) -> Vec<(&GroupKey, &[FeatureRow])> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 1..=self.rows.len() {
            if i == self.rows.len() || self.rows[i].key != self.rows[start].key {
                groups.push((&self.rows[start].key, &self.rows[start..i]));
                start = i;
            }
        }
        groups
    }

    /// Original columns in feature-row order followed by the derived columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let idx = IdxCa::from_vec(
            "idx",
            self.rows.iter().map(|r| r.source_row as IdxSize).collect(),
        );
        let original = self.source.take(&idx)?;

        let cal = |f: fn(&CalendarFeatures) -> f64| -> Vec<f64> {
            self.rows.iter().map(|r| f(&r.calendar)).collect()
        };
        let mut derived = vec![
            Series::new(
                "year",
                self.rows.iter().map(|r| r.calendar.year).collect::<Vec<i32>>(),
            ),
            Series::new(
                "month",
                self.rows.iter().map(|r| r.calendar.month).collect::<Vec<u32>>(),
            ),
            Series::new(
                "quarter",
                self.rows.iter().map(|r| r.calendar.quarter).collect::<Vec<u32>>(),
            ),
            Series::new(
                "iso_week",
                self.rows.iter().map(|r| r.calendar.iso_week).collect::<Vec<u32>>(),
            ),
            Series::new(
                "day_of_year",
                self.rows
                    .iter()
                    .map(|r| r.calendar.day_of_year)
                    .collect::<Vec<u32>>(),
            ),
            Series::new("month_sin", cal(|c| c.month_sin)),
            Series::new("month_cos", cal(|c| c.month_cos)),
            Series::new("week_sin", cal(|c| c.week_sin)),
            Series::new("week_cos", cal(|c| c.week_cos)),
            Series::new(
                "region_code",
                self.rows.iter().map(|r| r.region_code as u32).collect::<Vec<u32>>(),
            ),
            Series::new(
                "technology_code",
                self.rows
                    .iter()
                    .map(|r| r.technology_code as u32)
                    .collect::<Vec<u32>>(),
            ),
        ];
        for &lag in &self.lags {
            derived.push(Series::new(
                &Feature::Lag(lag).name(),
                self.rows.iter().map(|r| r.lag(lag)).collect::<Vec<Option<f64>>>(),
            ));
        }
        for &window in &self.rolling_windows {
            derived.push(Series::new(
                &Feature::MovingAverage(window).name(),
                self.rows
                    .iter()
                    .map(|r| r.moving_average(window))
                    .collect::<Vec<Option<f64>>>(),
            ));
        }

        Ok(original.hstack(&derived)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use approx::assert_abs_diff_eq;

    fn observation(day: u32, region: &str, technology: &str, production: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            region: region.to_string(),
            technology: technology.to_string(),
            production,
            source_row: 0,
        }
    }

    #[test]
    fn calendar_decomposition() {
        let calendar = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap());
        assert_eq!(calendar.year, 2024);
        assert_eq!(calendar.month, 8);
        assert_eq!(calendar.quarter, 3);
        assert_eq!(calendar.iso_week, 33);
        assert_eq!(calendar.day_of_year, 228);
    }

    #[test]
    fn december_and_january_are_adjacent() {
        let (dec_sin, dec_cos) = cyclical(12.0, 12.0);
        let (jan_sin, jan_cos) = cyclical(1.0, 12.0);
        let distance = ((dec_sin - jan_sin).powi(2) + (dec_cos - jan_cos).powi(2)).sqrt();
        let (jun_sin, jun_cos) = cyclical(6.0, 12.0);
        let far = ((dec_sin - jun_sin).powi(2) + (dec_cos - jun_cos).powi(2)).sqrt();
        assert!(distance < far);
        assert_abs_diff_eq!(dec_cos, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn category_codes_follow_sorted_order() {
        let index = CategoryIndex::from_labels(["Wind", "Hydro", "Solar", "Hydro"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.code("Hydro"), Some(0));
        assert_eq!(index.code("Wind"), Some(2));
        assert_eq!(index.label(1), Some("Solar"));
        assert_eq!(index.code("Coal"), None);
    }

    #[test]
    fn rows_are_sorted_and_grouped() {
        let table = ProductionTable::from_observations(vec![
            observation(15, "South", "Wind", 3.0),
            observation(8, "North", "Solar", 2.0),
            observation(1, "South", "Wind", 1.0),
            observation(1, "North", "Solar", 1.0),
        ])
        .unwrap();
        let features = FeatureBuilder::new(vec![1], vec![2]).unwrap().build(&table).unwrap();

        let groups = features.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, &GroupKey::new("North", "Solar"));
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[0].production, 1.0);
        assert_eq!(groups[1].1[1].lag(1), Some(1.0));
        assert_eq!(groups[1].1[1].moving_average(2), Some(2.0));
    }

    #[test]
    fn vectorize_follows_set_order_and_rejects_missing_lags() {
        let table = ProductionTable::from_observations(vec![
            observation(1, "North", "Solar", 4.0),
            observation(8, "North", "Solar", 6.0),
        ])
        .unwrap();
        let features = FeatureBuilder::new(vec![1], vec![4]).unwrap().build(&table).unwrap();
        let set = FeatureSet::new(vec![Feature::MovingAverage(4), Feature::Lag(1)]).unwrap();

        assert_eq!(set.vectorize(&features.rows()[0]), None);
        assert_eq!(set.vectorize(&features.rows()[1]), Some(vec![5.0, 4.0]));
        assert_eq!(set.names(), vec!["ma_4", "lag_1"]);
    }

    #[test]
    fn default_feature_set_matches_config() {
        let set = FeatureSet::from_config(&ForecastConfig::default());
        assert_eq!(set.len(), 14);
        assert_eq!(set.features()[9], Feature::Lag(1));
        assert_eq!(set.features()[13], Feature::MovingAverage(8));
    }

    #[test]
    fn dataframe_view_keeps_original_columns() {
        let table = ProductionTable::from_observations(vec![
            observation(8, "North", "Solar", 6.0),
            observation(1, "North", "Solar", 4.0),
        ])
        .unwrap();
        let features = FeatureBuilder::new(vec![1], vec![2]).unwrap().build(&table).unwrap();
        let df = features.to_dataframe().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 4 + 11 + 2);
        let production: Vec<Option<f64>> =
            df.column("production_mwh").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(production, vec![Some(4.0), Some(6.0)]);
        assert_eq!(df.column("lag_1").unwrap().null_count(), 1);
    }
}
