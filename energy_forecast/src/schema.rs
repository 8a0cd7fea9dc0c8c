//! Required input columns

use crate::error::{ForecastError, Result};
use polars::prelude::DataFrame;

pub const DATE_COLUMN: &str = "date";
pub const REGION_COLUMN: &str = "region";
pub const TECHNOLOGY_COLUMN: &str = "technology";
pub const PRODUCTION_COLUMN: &str = "production_mwh";

/// Columns every input table must carry, in reporting order
pub const REQUIRED_COLUMNS: [&str; 4] = [
    REGION_COLUMN,
    TECHNOLOGY_COLUMN,
    PRODUCTION_COLUMN,
    DATE_COLUMN,
];

/// Check a list of column names against [`REQUIRED_COLUMNS`]
pub fn validate_columns<S: AsRef<str>>(columns: &[S]) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !columns.iter().any(|c| c.as_ref() == **required))
        .map(|required| required.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ForecastError::Schema { missing })
    }
}

/// Check a DataFrame's columns against [`REQUIRED_COLUMNS`]
pub fn validate_dataframe(df: &DataFrame) -> Result<()> {
    validate_columns(&df.get_column_names())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_extra_columns() {
        let cols = ["date", "region", "technology", "production_mwh", "plant"];
        assert!(validate_columns(&cols).is_ok());
    }

    #[test]
    fn lists_exactly_the_missing_columns() {
        let err = validate_columns(&["date", "technology"]).unwrap_err();
        match err {
            ForecastError::Schema { missing } => {
                assert_eq!(missing, vec!["region", "production_mwh"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
