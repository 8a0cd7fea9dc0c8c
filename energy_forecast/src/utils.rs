//! Utility functions for the energy_forecast crate

use crate::config::Cadence;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Parse a calendar date from the formats found in production exports
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Dates of the `horizon` periods following `last`
pub fn future_dates(last: NaiveDate, horizon: usize, cadence: Cadence) -> Vec<NaiveDate> {
    let step = cadence.step();
    let mut dates = Vec::with_capacity(horizon);
    let mut current = last;

    for _ in 0..horizon {
        current += step;
        dates.push(current);
    }

    dates
}

/// Index at which a chronologically ordered set of `len` rows is split
/// into training and held-out parts
pub fn split_index(len: usize, test_fraction: f64) -> usize {
    let index = (len as f64 * (1.0 - test_fraction)).floor();
    (index.max(0.0) as usize).min(len)
}

/// Percentage change from `from` to `to`, `None` when `from` is zero
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from.abs() < f64::EPSILON {
        None
    } else {
        Some((to - from) / from * 100.0)
    }
}
