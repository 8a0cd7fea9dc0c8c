//! Error types for the energy_forecast crate

use polars::prelude::PolarsError;
use production_math::MathError;
use thiserror::Error;

/// Custom error types for the energy_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Required input columns are absent
    #[error("Missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Too few fully populated rows to train and evaluate
    #[error("Insufficient data: need at least {required} complete rows, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised while fitting or applying a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error writing delimited output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error reading configuration or writing the JSON report
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl ForecastError {
    /// True for the precondition failure a caller may degrade from
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ForecastError::InsufficientData { .. })
    }
}
