//! Regression helpers for trend estimation and seasonal curve fitting
//!
//! Contains:
//! - Linear trend over an evenly indexed series
//! - Ordinary least squares for small dense design matrices

use crate::{MathError, Result};

/// Linear trend fitted over a series indexed 0, 1, 2, ...
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    slope: f64,
    intercept: f64,
    r_squared: f64,
    len: usize,
}

impl LinearTrend {
    /// Fit the trend line through `values`
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(MathError::InsufficientData(
                "Not enough data for a trend. Need at least 2 points.".to_string(),
            ));
        }

        let n = values.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let x = i as f64;
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        let slope = numerator / denominator;
        let intercept = y_mean - slope * x_mean;

        let mut ss_total = 0.0;
        let mut ss_residual = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let y_pred = slope * i as f64 + intercept;
            ss_total += (y - y_mean).powi(2);
            ss_residual += (y - y_pred).powi(2);
        }

        // A flat series is explained perfectly by a flat line
        let r_squared = if ss_total.abs() < 1e-12 {
            1.0
        } else {
            1.0 - ss_residual / ss_total
        };

        Ok(Self {
            slope,
            intercept,
            r_squared,
            len: values.len(),
        })
    }

    /// Predict the value `periods_ahead` steps after the last fitted point
    pub fn forecast(&self, periods_ahead: usize) -> f64 {
        let x = (self.len + periods_ahead - 1) as f64;
        self.slope * x + self.intercept
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }
}

/// Solve `min ||X b - y||²` through the normal equations.
///
/// `design` is row-major with every row the same width. A tiny ridge term
/// keeps near-collinear columns solvable.
pub fn least_squares(design: &[Vec<f64>], targets: &[f64]) -> Result<Vec<f64>> {
    if design.is_empty() || design.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but {} targets were given",
            design.len(),
            targets.len()
        )));
    }

    let width = design[0].len();
    if width == 0 || design.iter().any(|row| row.len() != width) {
        return Err(MathError::InvalidInput(
            "Design rows must share a non-zero width".to_string(),
        ));
    }
    if design.len() < width {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} rows to fit {} coefficients, have {}",
            width,
            width,
            design.len()
        )));
    }

    // Normal equations: (X'X + λI) b = X'y
    let mut gram = vec![vec![0.0; width]; width];
    let mut rhs = vec![0.0; width];
    for (row, &y) in design.iter().zip(targets) {
        for i in 0..width {
            rhs[i] += row[i] * y;
            for j in 0..width {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, gram_row) in gram.iter_mut().enumerate() {
        gram_row[i] += 1e-9;
    }

    solve_linear_system(gram, rhs)
}

/// Gaussian elimination with partial pivoting
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);

        if a[pivot][col].abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Singular system: columns are linearly dependent".to_string(),
            ));
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    Ok(x)
}
