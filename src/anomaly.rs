use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::SegmentKey;
use crate::performance::PerformanceIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyClassification {
    NoData,
    NoSuspicion,
    ModerateSuspicion,
    HighSuspicion,
}

impl AnomalyClassification {
    pub fn is_suspicious(&self) -> bool {
        matches!(
            self,
            AnomalyClassification::ModerateSuspicion | AnomalyClassification::HighSuspicion
        )
    }
}

impl fmt::Display for AnomalyClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnomalyClassification::NoData => "NO_DATA",
            AnomalyClassification::NoSuspicion => "NO_SUSPICION",
            AnomalyClassification::ModerateSuspicion => "MODERATE_SUSPICION",
            AnomalyClassification::HighSuspicion => "HIGH_SUSPICION",
        };
        f.write_str(label)
    }
}

/// One suspicion level. All three conditions must hold:
/// `pi_real < relative_limit`, `ai_value < relative_limit` and
/// `time_difference >= base_threshold * absolute_factor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuspicionTier {
    pub classification: AnomalyClassification,
    pub relative_limit: f64,
    pub absolute_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    /// `[consistency_lower, consistency_upper)` counts as the runner's own pace.
    pub consistency_lower: f64,
    pub consistency_upper: f64,
    pub reference_share: f64,
    pub min_absolute_seconds: f64,
    pub max_absolute_seconds: f64,
    pub short_segment_seconds: f64,
    pub short_segment_factor: f64,
    /// First matching tier wins.
    pub tiers: Vec<SuspicionTier>,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            consistency_lower: 0.85,
            consistency_upper: 1.18,
            reference_share: 0.20,
            min_absolute_seconds: 40.0,
            max_absolute_seconds: 150.0,
            short_segment_seconds: 50.0,
            short_segment_factor: 0.70,
            tiers: vec![
                SuspicionTier {
                    classification: AnomalyClassification::HighSuspicion,
                    relative_limit: 0.30,
                    absolute_factor: 1.8,
                },
                SuspicionTier {
                    classification: AnomalyClassification::ModerateSuspicion,
                    relative_limit: 0.45,
                    absolute_factor: 1.0,
                },
            ],
        }
    }
}

impl AnomalyThresholds {
    /// Seconds a runner must save before any tier can apply.
    pub fn base_absolute_threshold(&self, reference_time: f64) -> f64 {
        (reference_time * self.reference_share)
            .clamp(self.min_absolute_seconds, self.max_absolute_seconds)
    }

    fn relative_factor(&self, reference_time: f64) -> f64 {
        if reference_time < self.short_segment_seconds {
            self.short_segment_factor
        } else {
            1.0
        }
    }

    fn is_consistent(&self, ai_value: f64) -> bool {
        ai_value >= self.consistency_lower && ai_value < self.consistency_upper
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyClassifier {
    thresholds: AnomalyThresholds,
}

impl AnomalyClassifier {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnomalyThresholds {
        &self.thresholds
    }

    /// `pi_real` is the leg's index against the segment reference, `ai_value`
    /// the real index against the runner's baseline index, `time_difference`
    /// the seconds saved against the reference.
    pub fn classify(
        &self,
        pi_real: f64,
        ai_value: f64,
        time_difference: f64,
        reference_time: f64,
    ) -> AnomalyClassification {
        let t = &self.thresholds;
        if !(pi_real.is_finite() && ai_value.is_finite() && time_difference.is_finite())
            || !reference_time.is_finite()
            || reference_time <= 0.0
        {
            return AnomalyClassification::NoData;
        }
        if time_difference <= 0.0 || t.is_consistent(ai_value) {
            return AnomalyClassification::NoSuspicion;
        }

        let relative_factor = t.relative_factor(reference_time);
        let base = t.base_absolute_threshold(reference_time);

        let classification = t
            .tiers
            .iter()
            .find(|tier| {
                let relative_limit = tier.relative_limit * relative_factor;
                pi_real < relative_limit
                    && ai_value < relative_limit
                    && time_difference >= base * tier.absolute_factor
            })
            .map(|tier| tier.classification)
            .unwrap_or(AnomalyClassification::NoSuspicion);

        if classification.is_suspicious() {
            debug!(
                pi_real,
                ai_value,
                time_difference,
                reference_time,
                %classification,
                "leg flagged"
            );
        }
        classification
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomaliesIndex {
    pub leg_number: u32,
    pub segment_key: SegmentKey,
    /// `pi_real / pi_expected`; `None` when no usable baseline exists.
    pub ai_value: Option<f64>,
    pub classification: AnomalyClassification,
    pub reference_time: f64,
}

impl AnomaliesIndex {
    pub fn new(
        leg_number: u32,
        segment_key: SegmentKey,
        pi_real: PerformanceIndex,
        pi_expected: Option<PerformanceIndex>,
        time_difference: f64,
        reference_time: f64,
        classifier: &AnomalyClassifier,
    ) -> Self {
        let ai_value = pi_expected
            .filter(|expected| expected.value() > 0.0)
            .map(|expected| pi_real.value() / expected.value());

        let classification = match ai_value {
            Some(ai) => classifier.classify(pi_real.value(), ai, time_difference, reference_time),
            None => AnomalyClassification::NoData,
        };

        Self {
            leg_number,
            segment_key,
            ai_value,
            classification,
            reference_time,
        }
    }

    pub fn no_data(leg_number: u32, segment_key: SegmentKey) -> Self {
        Self {
            leg_number,
            segment_key,
            ai_value: None,
            classification: AnomalyClassification::NoData,
            reference_time: 0.0,
        }
    }
}
