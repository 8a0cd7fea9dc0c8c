//! Production record loading and grouping

use crate::error::{ForecastError, Result};
use crate::schema::{self, DATE_COLUMN, PRODUCTION_COLUMN, REGION_COLUMN, TECHNOLOGY_COLUMN};
use crate::utils::parse_date;
use chrono::NaiveDate;
use log::{debug, info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

/// Partition key: every lag and rollout state is scoped to one of these
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub region: String,
    pub technology: String,
}

impl GroupKey {
    pub fn new(region: impl Into<String>, technology: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            technology: technology.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.region, self.technology)
    }
}

/// One production record
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub region: String,
    pub technology: String,
    pub production: f64,
    /// Row of the source table this record came from
    pub source_row: usize,
}

impl Observation {
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.region.clone(), self.technology.clone())
    }
}

/// Dated values of a single group, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesData {
    key: GroupKey,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeriesData {
    /// Create a series; dates and values must line up
    pub fn new(key: GroupKey, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "Series {} has {} dates but {} values",
                key,
                dates.len(),
                values.len()
            )));
        }

        Ok(Self { key, dates, values })
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Validated production records plus the table they were read from
#[derive(Debug, Clone)]
pub struct ProductionTable {
    source: DataFrame,
    observations: Vec<Observation>,
    dropped_rows: usize,
}

/// Data loader for production tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load production records from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<ProductionTable> {
        let path = path.as_ref();
        info!("Loading production data from {}", path.display());

        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Create a production table from an existing DataFrame
    pub fn from_dataframe(df: DataFrame) -> Result<ProductionTable> {
        schema::validate_dataframe(&df)?;

        let dates = Self::text_column(&df, DATE_COLUMN)?;
        let regions = Self::text_column(&df, REGION_COLUMN)?;
        let technologies = Self::text_column(&df, TECHNOLOGY_COLUMN)?;
        let production = df.column(PRODUCTION_COLUMN)?.cast(&DataType::Float64)?;
        let production = production.f64()?;

        let mut observations = Vec::with_capacity(df.height());
        let mut dropped_rows = 0;

        for (row, (((date, region), technology), value)) in dates
            .iter()
            .zip(regions.iter())
            .zip(technologies.iter())
            .zip(production.into_iter())
            .enumerate()
        {
            let parsed = match (date.as_deref().and_then(parse_date), region, technology, value) {
                (Some(date), Some(region), Some(technology), Some(value))
                    if value.is_finite() && value >= 0.0 && !region.trim().is_empty()
                        && !technology.trim().is_empty() =>
                {
                    Some(Observation {
                        date,
                        region: region.trim().to_string(),
                        technology: technology.trim().to_string(),
                        production: value,
                        source_row: row,
                    })
                }
                _ => None,
            };

            match parsed {
                Some(observation) => observations.push(observation),
                None => {
                    debug!("Dropping row {}: missing or invalid required value", row);
                    dropped_rows += 1;
                }
            }
        }

        if dropped_rows > 0 {
            warn!(
                "Dropped {} of {} rows with missing or invalid required values",
                dropped_rows,
                df.height()
            );
        }
        info!(
            "Loaded {} production records across {} columns",
            observations.len(),
            df.width()
        );

        Ok(ProductionTable {
            source: df,
            observations,
            dropped_rows,
        })
    }

    /// Read a required column as optional strings
    fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
        let series = df.column(name)?.cast(&DataType::Utf8)?;
        let values = series
            .utf8()?
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect();
        Ok(values)
    }
}

impl ProductionTable {
    /// Build a table from in-memory records; the source frame holds the
    /// four required columns
    pub fn from_observations(mut observations: Vec<Observation>) -> Result<Self> {
        for (row, observation) in observations.iter_mut().enumerate() {
            observation.source_row = row;
        }

        let df = DataFrame::new(vec![
            Series::new(
                DATE_COLUMN,
                observations
                    .iter()
                    .map(|o| o.date.format("%Y-%m-%d").to_string())
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                REGION_COLUMN,
                observations.iter().map(|o| o.region.clone()).collect::<Vec<_>>(),
            ),
            Series::new(
                TECHNOLOGY_COLUMN,
                observations
                    .iter()
                    .map(|o| o.technology.clone())
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                PRODUCTION_COLUMN,
                observations.iter().map(|o| o.production).collect::<Vec<_>>(),
            ),
        ])?;

        Ok(Self {
            source: df,
            observations,
            dropped_rows: 0,
        })
    }

    /// Records in input order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// The table as read, extra columns included
    pub fn source(&self) -> &DataFrame {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Rows discarded while loading
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn production_values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.production).collect()
    }

    /// First and last observed dates
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.observations.iter().map(|o| o.date).min()?;
        let last = self.observations.iter().map(|o| o.date).max()?;
        Some((first, last))
    }

    /// Observations per group, each group ordered by date
    pub fn groups(&self) -> BTreeMap<GroupKey, Vec<&Observation>> {
        let mut groups: BTreeMap<GroupKey, Vec<&Observation>> = BTreeMap::new();
        for observation in &self.observations {
            groups.entry(observation.key()).or_default().push(observation);
        }
        for rows in groups.values_mut() {
            rows.sort_by_key(|o| o.date);
        }
        groups
    }

    /// One dated series per group, in key order
    pub fn group_series(&self) -> Vec<TimeSeriesData> {
        self.groups()
            .into_iter()
            .map(|(key, rows)| TimeSeriesData {
                key,
                dates: rows.iter().map(|o| o.date).collect(),
                values: rows.iter().map(|o| o.production).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df! {
            "date" => ["2024-01-01", "2024-01-08", "bad", "2024-01-15", "2024-01-01"],
            "region" => ["North", "North", "North", "North", "South"],
            "technology" => ["Solar", "Solar", "Solar", "Solar", "Wind"],
            "production_mwh" => [10.0, -1.0, 5.0, 12.0, 7.0],
            "plant" => ["a", "b", "c", "d", "e"],
        }
        .unwrap()
    }

    #[test]
    fn drops_invalid_rows_and_keeps_source() {
        let table = DataLoader::from_dataframe(frame()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.dropped_rows(), 2);
        assert_eq!(table.source().width(), 5);
        let rows: Vec<usize> = table.observations().iter().map(|o| o.source_row).collect();
        assert_eq!(rows, vec![0, 3, 4]);
    }

    #[test]
    fn groups_are_keyed_and_ordered() {
        let table = DataLoader::from_dataframe(frame()).unwrap();
        let series = table.group_series();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].key(), &GroupKey::new("North", "Solar"));
        assert_eq!(series[0].values(), &[10.0, 12.0]);
        assert_eq!(
            table.date_range(),
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
            ))
        );
    }

    #[test]
    fn missing_columns_fail_fast() {
        let df = df! { "date" => ["2024-01-01"], "region" => ["North"] }.unwrap();
        assert!(matches!(
            DataLoader::from_dataframe(df),
            Err(ForecastError::Schema { .. })
        ));
    }
}
