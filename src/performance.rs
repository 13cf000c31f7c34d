use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::{Result, ScoringError};

/// Ratio of a runner's time to a reference time. `1.0` means reference pace,
/// larger is slower.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct PerformanceIndex {
    value: f64,
}

impl PerformanceIndex {
    /// A leg at or beyond this index counts as a mistake.
    pub const MISTAKE_THRESHOLD: f64 = 1.30;

    pub fn of(runner_time: f64, best_time: f64) -> Result<Self> {
        if !best_time.is_finite() || best_time <= 0.0 {
            return Err(ScoringError::InvalidBestTime(best_time));
        }
        if !runner_time.is_finite() || runner_time < 0.0 {
            return Err(ScoringError::InvalidRunnerTime(runner_time));
        }
        Ok(Self {
            value: runner_time / best_time,
        })
    }

    /// Wraps an already computed index value.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(ScoringError::InvalidIndexValue(value));
        }
        Ok(Self { value })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_mistake(&self) -> bool {
        self.is_mistake_at(Self::MISTAKE_THRESHOLD)
    }

    pub fn is_mistake_at(&self, threshold: f64) -> bool {
        self.value >= threshold
    }
}

impl PartialEq for PerformanceIndex {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PerformanceIndex {}

impl PartialOrd for PerformanceIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PerformanceIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value)
    }
}

impl fmt::Display for PerformanceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.value)
    }
}
