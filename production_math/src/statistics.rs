//! Distribution statistics and diagnostics
//!
//! Moments, quantiles, outlier screens and the Jarque-Bera normality test.

use crate::volatility::standard_deviation;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

fn require_values(values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "No values supplied".to_string(),
        ));
    }
    Ok(())
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    require_values(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    require_values(values)?;
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must lie in [0, 1], got {}",
            q
        )));
    }

    let sorted = sorted(values);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn median(values: &[f64]) -> Result<f64> {
    quantile(values, 0.5)
}

/// Central moments m2, m3, m4 (population)
fn central_moments(values: &[f64]) -> Result<(f64, f64, f64)> {
    let mu = mean(values)?;
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - mu;
        m2 += d * d;
        m3 += d * d * d;
        m4 += d * d * d * d;
    }
    Ok((m2 / n, m3 / n, m4 / n))
}

/// Population skewness; zero for a constant series
pub fn skewness(values: &[f64]) -> Result<f64> {
    let (m2, m3, _) = central_moments(values)?;
    if m2 < 1e-300 {
        return Ok(0.0);
    }
    Ok(m3 / m2.powf(1.5))
}

/// Excess (Fisher) kurtosis; zero for a constant series
pub fn excess_kurtosis(values: &[f64]) -> Result<f64> {
    let (m2, _, m4) = central_moments(values)?;
    if m2 < 1e-300 {
        return Ok(0.0);
    }
    Ok(m4 / (m2 * m2) - 3.0)
}

/// Tukey fence screen result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierScreen {
    pub count: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Values outside `[q1 - 1.5 IQR, q3 + 1.5 IQR]`
pub fn iqr_outliers(values: &[f64]) -> Result<OutlierScreen> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;

    let count = values
        .iter()
        .filter(|&&v| v < lower_bound || v > upper_bound)
        .count();

    Ok(OutlierScreen {
        count,
        lower_bound,
        upper_bound,
    })
}

/// Number of values whose population z-score exceeds `threshold`
pub fn zscore_outliers(values: &[f64], threshold: f64) -> Result<usize> {
    let mu = mean(values)?;
    let sigma = standard_deviation(values, false)?;
    if sigma < f64::EPSILON {
        return Ok(0);
    }
    Ok(values
        .iter()
        .filter(|&&v| ((v - mu) / sigma).abs() > threshold)
        .count())
}

/// Jarque-Bera normality test outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
    /// p-value above 0.05
    pub is_normal: bool,
}

/// Jarque-Bera test against a chi-squared distribution with 2 degrees of freedom
pub fn jarque_bera(values: &[f64]) -> Result<NormalityTest> {
    if values.len() < 3 {
        return Err(MathError::InsufficientData(format!(
            "Normality test needs at least 3 values, have {}",
            values.len()
        )));
    }

    let n = values.len() as f64;
    let s = skewness(values)?;
    let k = excess_kurtosis(values)?;
    let statistic = n / 6.0 * (s * s + k * k / 4.0);

    let chi2 = ChiSquared::new(2.0).map_err(|e| MathError::CalculationError(e.to_string()))?;
    let p_value = 1.0 - chi2.cdf(statistic);

    Ok(NormalityTest {
        statistic,
        p_value,
        is_normal: p_value > 0.05,
    })
}

/// Pearson correlation of two equally long series; `None` when either is constant
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Result<Option<f64>> {
    if a.len() != b.len() {
        return Err(MathError::InvalidInput(format!(
            "Series lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.len() < 2 {
        return Err(MathError::InsufficientData(
            "Correlation needs at least 2 pairs".to_string(),
        ));
    }

    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    if var_a < 1e-300 || var_b < 1e-300 {
        return Ok(None);
    }
    Ok(Some(cov / (var_a * var_b).sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(0.25, 1.75)]
    #[case(0.5, 2.5)]
    #[case(1.0, 4.0)]
    fn test_quantile_interpolates(#[case] q: f64, #[case] expected: f64) {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_abs_diff_eq!(quantile(&values, q).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_rejects_bad_input() {
        assert!(quantile(&[], 0.5).is_err());
        assert!(quantile(&[1.0], 1.5).is_err());
    }

    #[test]
    fn test_moments_of_symmetric_series() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_abs_diff_eq!(mean(&values).unwrap(), 3.0);
        assert_abs_diff_eq!(median(&values).unwrap(), 3.0);
        assert_abs_diff_eq!(skewness(&values).unwrap(), 0.0, epsilon = 1e-12);
        // Uniform-like spread is platykurtic
        assert!(excess_kurtosis(&values).unwrap() < 0.0);
    }

    #[test]
    fn test_constant_series_moments() {
        let values = [7.0; 6];
        assert_eq!(skewness(&values).unwrap(), 0.0);
        assert_eq!(excess_kurtosis(&values).unwrap(), 0.0);
        assert_eq!(zscore_outliers(&values, 3.0).unwrap(), 0);
    }

    #[test]
    fn test_iqr_outliers() {
        let values = [10.0, 11.0, 12.0, 11.0, 10.0, 12.0, 11.0, 95.0];
        let screen = iqr_outliers(&values).unwrap();
        assert_eq!(screen.count, 1);
        assert!(screen.upper_bound < 95.0);
    }

    #[test]
    fn test_zscore_outliers() {
        let mut values = vec![10.0; 30];
        values.push(100.0);
        assert_eq!(zscore_outliers(&values, 3.0).unwrap(), 1);
    }

    #[test]
    fn test_jarque_bera() {
        // Heavily skewed series is not normal
        let mut skewed = vec![1.0; 40];
        skewed.extend([50.0, 60.0, 80.0]);
        let test = jarque_bera(&skewed).unwrap();
        assert!(test.statistic > 0.0);
        assert!(!test.is_normal);

        assert!(jarque_bera(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_pearson_correlation() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_abs_diff_eq!(r.unwrap(), 1.0, epsilon = 1e-12);

        let r = pearson_correlation(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert_abs_diff_eq!(r.unwrap(), -1.0, epsilon = 1e-12);

        assert_eq!(pearson_correlation(&[1.0, 1.0], &[1.0, 2.0]).unwrap(), None);
        assert!(pearson_correlation(&[1.0], &[1.0, 2.0]).is_err());
    }
}
