//! # Energy Outlook
//!
//! Umbrella crate for the energy outlook workspace.
//!
//! - [`production_math`]: rolling windows, trends, volatility and
//!   distribution statistics
//! - [`energy_forecast`]: loading, feature engineering, forecasting,
//!   descriptive analysis and reporting
//!
//! ## Example
//!
//! ```
//! use energy_outlook_workspace::production_math::statistics::median;
//! use energy_outlook_workspace::energy_forecast::ForecastConfig;
//!
//! assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
//! assert_eq!(ForecastConfig::default().lags, vec![1, 2, 4]);
//! ```

pub use energy_forecast;
pub use production_math;

/// Versions of the member crates as `(name, version)` pairs
pub fn member_versions() -> Vec<(&'static str, &'static str)> {
    vec![
        (energy_forecast::NAME, energy_forecast::VERSION),
        (production_math::NAME, production_math::VERSION),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_versions() {
        let names: Vec<&str> = member_versions().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["energy_forecast", "production_math"]);
        assert!(member_versions().iter().all(|(_, version)| !version.is_empty()));
    }

    #[test]
    fn test_reexports_are_usable() {
        let config = energy_forecast::ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(production_math::statistics::mean(&[1.0, 3.0]).unwrap(), 2.0);
    }
}
