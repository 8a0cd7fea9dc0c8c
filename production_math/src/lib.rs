//! # Production Math
//!
//! Numeric building blocks for energy production time series.
//! This crate provides the rolling-window, trend, volatility and
//! distribution calculations used by the forecasting pipeline and its
//! descriptive reports.

use thiserror::Error;

pub mod forecasting;
pub mod moving_averages;
pub mod statistics;
pub mod volatility;

/// Errors that can occur in production series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for production math operations
pub type Result<T> = std::result::Result<T, MathError>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
