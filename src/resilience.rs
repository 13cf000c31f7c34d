use std::fmt;

use serde::{Deserialize, Serialize};

use crate::performance::PerformanceIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResilienceClassification {
    /// Faster than normal after the mistake.
    Panic,
    /// Back to normal pace.
    IceMan,
    /// Slower than normal after the mistake.
    Resigner,
}

impl fmt::Display for ResilienceClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResilienceClassification::Panic => "PANIC",
            ResilienceClassification::IceMan => "ICE_MAN",
            ResilienceClassification::Resigner => "RESIGNER",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MentalResilienceIndex {
    value: f64,
}

impl MentalResilienceIndex {
    pub const DEFAULT_TOLERANCE: f64 = 0.05;

    pub fn of(reaction: PerformanceIndex, normal: PerformanceIndex) -> Self {
        Self {
            value: reaction.value() - normal.value(),
        }
    }

    pub fn from_value(value: f64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn classify(&self) -> ResilienceClassification {
        self.classify_with(Self::DEFAULT_TOLERANCE)
    }

    /// Values within `±tolerance` (inclusive) are stable.
    pub fn classify_with(&self, tolerance: f64) -> ResilienceClassification {
        if self.value < -tolerance {
            ResilienceClassification::Panic
        } else if self.value > tolerance {
            ResilienceClassification::Resigner
        } else {
            ResilienceClassification::IceMan
        }
    }

    pub fn is_panic(&self) -> bool {
        self.classify() == ResilienceClassification::Panic
    }

    pub fn is_resignation(&self) -> bool {
        self.classify() == ResilienceClassification::Resigner
    }

    pub fn is_stable(&self) -> bool {
        self.classify() == ResilienceClassification::IceMan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pi(value: f64) -> PerformanceIndex {
        PerformanceIndex::new(value).expect("valid index")
    }

    #[test]
    fn faster_after_mistake_is_panic() {
        let index = MentalResilienceIndex::of(pi(1.05), pi(1.15));
        assert!((index.value() - -0.10).abs() < 1e-9);
        assert_eq!(index.classify(), ResilienceClassification::Panic);
        assert!(index.is_panic());
        assert!(!index.is_stable());
    }

    #[test]
    fn same_pace_is_ice_man() {
        let index = MentalResilienceIndex::of(pi(1.15), pi(1.15));
        assert_eq!(index.value(), 0.0);
        assert_eq!(index.classify(), ResilienceClassification::IceMan);
        assert!(index.is_stable());
    }

    #[test]
    fn slower_after_mistake_is_resignation() {
        let index = MentalResilienceIndex::of(pi(1.40), pi(1.10));
        assert_eq!(index.classify(), ResilienceClassification::Resigner);
        assert!(index.is_resignation());
    }

    #[test]
    fn tolerance_edges_are_stable() {
        assert!(MentalResilienceIndex::from_value(0.05).is_stable());
        assert!(MentalResilienceIndex::from_value(-0.05).is_stable());
        assert!(MentalResilienceIndex::from_value(0.0501).is_resignation());
        assert!(MentalResilienceIndex::from_value(-0.0501).is_panic());
    }

    #[test]
    fn tolerance_can_be_overridden() {
        let index = MentalResilienceIndex::from_value(0.08);
        assert_eq!(index.classify(), ResilienceClassification::Resigner);
        assert_eq!(index.classify_with(0.10), ResilienceClassification::IceMan);
        assert_eq!(
            MentalResilienceIndex::from_value(-0.08).classify_with(0.02),
            ResilienceClassification::Panic
        );
    }
}
