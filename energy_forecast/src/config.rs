//! Run configuration for feature building and forecasting

use crate::error::{ForecastError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Spacing between consecutive observations and forecast periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    #[default]
    Weekly,
}

impl Cadence {
    /// Length of one period
    pub fn step(&self) -> Duration {
        match self {
            Cadence::Daily => Duration::days(1),
            Cadence::Weekly => Duration::weeks(1),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
        }
    }
}

/// Multiplicative weekly wave with optional gaussian noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalWave {
    pub amplitude: f64,
    #[serde(default)]
    pub noise_std: f64,
}

/// Adjustments applied to rollout predictions before clamping
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PostProcessing {
    /// Disabled when `None`
    #[serde(default)]
    pub seasonal_wave: Option<SeasonalWave>,
}

/// Settings for the per-group additive seasonal model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveConfig {
    pub enabled: bool,
    pub fourier_order: usize,
    pub interval_width: f64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fourier_order: 3,
            interval_width: 0.8,
        }
    }
}

/// Every tunable of one forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Trees in the forest
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features sampled per split; all when `None`
    pub max_features: Option<usize>,
    pub random_seed: u64,
    /// Share of the newest clean rows held out for evaluation
    pub test_fraction: f64,
    /// Forecast periods when the caller gives no horizon
    pub default_horizon: usize,
    /// Minimum fully populated rows needed to train
    pub min_data_points: usize,
    /// Groups shorter than this are not rolled out
    pub min_group_rows: usize,
    pub lags: Vec<usize>,
    pub rolling_windows: Vec<usize>,
    /// True values used to seed each rollout buffer; at least the largest
    /// lag and rolling window
    pub seed_history: usize,
    pub history_capacity: usize,
    pub cadence: Cadence,
    pub post_processing: PostProcessing,
    pub additive: AdditiveConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 8,
            min_samples_split: 3,
            max_features: None,
            random_seed: 42,
            test_fraction: 0.2,
            default_horizon: 20,
            min_data_points: 8,
            min_group_rows: 3,
            lags: vec![1, 2, 4],
            rolling_windows: vec![4, 8],
            seed_history: 8,
            history_capacity: 20,
            cadence: Cadence::Weekly,
            post_processing: PostProcessing::default(),
            additive: AdditiveConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: ForecastConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Largest lag offset, zero when no lags are configured
    pub fn max_lag(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0)
    }

    /// Largest rolling window, zero when none are configured
    pub fn max_window(&self) -> usize {
        self.rolling_windows.iter().copied().max().unwrap_or(0)
    }

    /// Reject values that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl Into<String>) -> Result<()> {
            Err(ForecastError::InvalidParameter(msg.into()))
        }

        if self.n_estimators == 0 {
            return invalid("n_estimators must be greater than zero");
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be greater than zero");
        }
        if self.min_samples_split < 2 {
            return invalid("min_samples_split must be at least 2");
        }
        if self.max_features == Some(0) {
            return invalid("max_features must be greater than zero when set");
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return invalid(format!(
                "test_fraction must lie strictly between 0 and 1, got {}",
                self.test_fraction
            ));
        }
        if self.default_horizon == 0 {
            return invalid("default_horizon must be greater than zero");
        }
        if self.min_data_points < 2 {
            return invalid("min_data_points must be at least 2");
        }
        if self.min_group_rows == 0 {
            return invalid("min_group_rows must be greater than zero");
        }
        if self.lags.iter().any(|&lag| lag == 0) {
            return invalid("lag offsets must be greater than zero");
        }
        if self.rolling_windows.iter().any(|&w| w == 0) {
            return invalid("rolling windows must be greater than zero");
        }
        let lookback = self.max_lag().max(self.max_window()).max(1);
        if self.seed_history < lookback {
            return invalid(format!(
                "seed_history {} is shorter than the {} values the lags and rolling means read",
                self.seed_history, lookback
            ));
        }
        if self.history_capacity < self.seed_history {
            return invalid(format!(
                "history_capacity {} cannot hold the {} seed values",
                self.history_capacity, self.seed_history
            ));
        }
        if let Some(wave) = self.post_processing.seasonal_wave {
            if !wave.amplitude.is_finite() || !wave.noise_std.is_finite() || wave.noise_std < 0.0
            {
                return invalid("seasonal wave needs a finite amplitude and non-negative noise");
            }
        }
        if self.additive.fourier_order == 0 {
            return invalid("fourier_order must be greater than zero");
        }
        if !(self.additive.interval_width > 0.0 && self.additive.interval_width < 1.0) {
            return invalid("interval_width must lie strictly between 0 and 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_lag(), 4);
        assert_eq!(config.max_window(), 8);
        assert_eq!(config.seed_history, 8);
        assert_eq!(config.cadence, Cadence::Weekly);
        assert!(config.post_processing.seasonal_wave.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let config = ForecastConfig {
            test_fraction: 1.0,
            ..ForecastConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ForecastError::InvalidParameter(_))
        ));

        let config = ForecastConfig {
            history_capacity: 4,
            ..ForecastConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ForecastConfig {
            seed_history: 4,
            ..ForecastConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ForecastConfig {
            lags: vec![0, 1],
            ..ForecastConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"n_estimators": 10, "cadence": "daily",
                "post_processing": {{"seasonal_wave": {{"amplitude": 0.1}}}}}}"#
        )
        .unwrap();

        let config = ForecastConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.cadence, Cadence::Daily);
        assert_eq!(config.max_depth, 8);
        let wave = config.post_processing.seasonal_wave.unwrap();
        assert_eq!(wave.amplitude, 0.1);
        assert_eq!(wave.noise_std, 0.0);
    }
}
