use serde::{Deserialize, Serialize};
use tracing::debug;

/// Median of the three fastest times, or the mean of the two fastest when
/// both are far ahead of the sample median.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustReferenceEstimator {
    pub fastest_gap: f64,
    pub runner_up_gap: f64,
}

impl Default for RobustReferenceEstimator {
    fn default() -> Self {
        Self {
            fastest_gap: 0.50,
            runner_up_gap: 0.40,
        }
    }
}

impl RobustReferenceEstimator {
    /// Reference time in seconds. Empty input yields `0.0`; non-finite and
    /// negative samples are ignored.
    pub fn estimate(&self, times: &[f64]) -> f64 {
        let mut sorted: Vec<f64> = times
            .iter()
            .copied()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .collect();
        sorted.sort_by(f64::total_cmp);

        match sorted.len() {
            0 => 0.0,
            1 | 2 => sorted[0],
            _ => {
                if self.majority_made_mistakes(&sorted) {
                    let reference = (sorted[0] + sorted[1]) / 2.0;
                    debug!(
                        samples = sorted.len(),
                        reference, "segment reference taken from leading pair"
                    );
                    reference
                } else {
                    median_of_fastest_three(&sorted)
                }
            }
        }
    }

    fn majority_made_mistakes(&self, sorted: &[f64]) -> bool {
        let (fastest, runner_up) = (sorted[0], sorted[1]);
        if fastest <= 0.0 {
            return false;
        }
        let median = median(sorted);
        let fastest_gap = median / fastest - 1.0;
        let runner_up_gap = median / runner_up - 1.0;

        fastest_gap >= self.fastest_gap && runner_up_gap >= self.runner_up_gap
    }
}

fn median_of_fastest_three(sorted: &[f64]) -> f64 {
    median(&sorted[..sorted.len().min(3)])
}

/// Median of an ascending slice; `0.0` when empty.
pub(crate) fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
