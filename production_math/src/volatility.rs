//! Volatility measures for production series
//!
//! Contains:
//! - Standard deviation (population and sample)
//! - Coefficient of variation

use crate::{MathError, Result};

/// Standard deviation of `values`; `sample` selects the n-1 denominator
pub fn standard_deviation(values: &[f64], sample: bool) -> Result<f64> {
    let min_len = if sample { 2 } else { 1 };
    if values.len() < min_len {
        return Err(MathError::InsufficientData(format!(
            "Standard deviation needs at least {} values, have {}",
            min_len,
            values.len()
        )));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    let denominator = if sample { n - 1.0 } else { n };

    Ok((squares / denominator).sqrt())
}

/// Sample standard deviation divided by the mean
pub fn coefficient_of_variation(values: &[f64]) -> Result<f64> {
    let std_dev = standard_deviation(values, true)?;
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    if mean.abs() < f64::EPSILON {
        return Err(MathError::CalculationError(
            "Mean is zero, coefficient of variation is undefined".to_string(),
        ));
    }

    Ok(std_dev / mean)
}
