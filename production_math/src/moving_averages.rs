//! Moving average and history window implementations
//!
//! Contains:
//! - Simple Moving Average (SMA) with strict and min-periods-1 readouts
//! - A batch trailing mean with min-periods-1 semantics
//! - A bounded history ring buffer used for recursive forecasting

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Update the SMA with a new value
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Get the SMA over a full window
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }

    /// Get the mean of however many values the window holds (at least one)
    pub fn partial_value(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.values.len() as f64)
        }
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }
}

/// Trailing mean over `window` values using every available value when
/// fewer than `window` exist, so the output is never undefined.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut sma = SimpleMovingAverage::new(window)?;
    let mut out = Vec::with_capacity(values.len());

    for &value in values {
        sma.update(value);
        // update() just pushed a value, so the window is non-empty
        out.push(sma.partial_value().unwrap_or(value));
    }

    Ok(out)
}

/// Value `offset` positions before each element, `None` where unavailable
pub fn lagged(values: &[f64], offset: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if offset == 0 {
                Some(values[i])
            } else if i >= offset {
                Some(values[i - offset])
            } else {
                None
            }
        })
        .collect()
}

/// Fixed-capacity history of recent values, oldest dropped first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    capacity: usize,
    values: VecDeque<f64>,
}

impl HistoryBuffer {
    /// Create an empty buffer holding at most `capacity` values
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MathError::InvalidInput(
                "History capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        })
    }

    /// Create a buffer seeded with the tail of `seed`
    pub fn seeded(capacity: usize, seed: &[f64]) -> Result<Self> {
        let mut buffer = Self::new(capacity)?;
        for &value in seed {
            buffer.push(value);
        }
        Ok(buffer)
    }

    /// Append a value, trimming the oldest entry when full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Value `offset` steps back (1 = most recent)
    pub fn lag(&self, offset: usize) -> Option<f64> {
        if offset == 0 || offset > self.values.len() {
            return None;
        }
        self.values.get(self.values.len() - offset).copied()
    }

    /// Mean of the most recent `window` values (all of them when fewer exist)
    pub fn trailing_mean(&self, window: usize) -> Option<f64> {
        if self.values.is_empty() || window == 0 {
            return None;
        }
        let take = window.min(self.values.len());
        let sum: f64 = self.values.iter().rev().take(take).sum();
        Some(sum / take as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the buffer, oldest first
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}
