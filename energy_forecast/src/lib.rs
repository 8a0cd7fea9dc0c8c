//! # Energy Forecast
//!
//! A Rust library for describing and forecasting energy production per
//! region and generation technology.
//!
//! ## Features
//!
//! - Production tables loaded from CSV with schema validation
//! - Calendar, cyclical, lag and rolling-mean features per group
//! - Random forest regression with a chronological train/test split
//! - Recursive multi-step rollout per (region, technology) group
//! - Optional additive trend plus yearly seasonality model
//! - Descriptive statistics, breakdowns and risk profile
//! - Historical versus projected comparison with recommendations
//!
//! ## Cadence
//!
//! The forecast horizon is a count of periods. The period length comes from
//! the configured [`Cadence`]:
//!
//! ```rust
//! use energy_forecast::config::Cadence;
//!
//! assert_eq!(Cadence::Weekly.step(), chrono::Duration::weeks(1));
//! assert_eq!(Cadence::Daily.step(), chrono::Duration::days(1));
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use energy_forecast::export::export_all;
//! use energy_forecast::{ForecastConfig, OutlookPipeline};
//! use std::path::Path;
//!
//! fn main() -> energy_forecast::error::Result<()> {
//!     let pipeline = OutlookPipeline::new(ForecastConfig::default())?;
//!
//!     // Describe, train, evaluate and forecast 8 weeks per group
//!     let report = pipeline.run_csv("production.csv", 8)?;
//!     if let Some(ensemble) = &report.ensemble {
//!         println!("{}", ensemble.report());
//!     }
//!     println!("{}", report.insights);
//!
//!     export_all(Path::new("outlook"), &report)?;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod features;
pub mod forecast;
pub mod insights;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod utils;

// Re-export commonly used types
pub use crate::config::{Cadence, ForecastConfig};
pub use crate::data::{DataLoader, GroupKey, ProductionTable, TimeSeriesData};
pub use crate::error::ForecastError;
pub use crate::features::{FeatureBuilder, FeatureSet, FeatureTable};
pub use crate::forecast::{ForecastEngine, ForecastOutcome, PredictionRecord};
pub use crate::metrics::EvaluationMetrics;
pub use crate::models::{ForecastModel, ForecastResult};
pub use crate::pipeline::{OutlookPipeline, OutlookReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
