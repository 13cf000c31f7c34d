use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyThresholds;
use crate::cup::{KristallRules, NorRules};
use crate::performance::PerformanceIndex;
use crate::reference::RobustReferenceEstimator;
use crate::resilience::MentalResilienceIndex;

/// Rule tables for every engine component. Missing fields in a config file
/// fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kristall: KristallRules,
    pub nor: NorRules,
    pub reference: RobustReferenceEstimator,
    pub anomaly: AnomalyThresholds,
    pub mistake_threshold: f64,
    pub resilience_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kristall: KristallRules::default(),
            nor: NorRules::default(),
            reference: RobustReferenceEstimator::default(),
            anomaly: AnomalyThresholds::default(),
            mistake_threshold: PerformanceIndex::MISTAKE_THRESHOLD,
            resilience_tolerance: MentalResilienceIndex::DEFAULT_TOLERANCE,
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }
}
