use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::anomaly::{AnomaliesIndex, AnomalyClassifier};
use crate::config::EngineConfig;
use crate::models::{PersonId, RunnerSplits, SegmentKey};
use crate::performance::PerformanceIndex;
use crate::reference::{median, RobustReferenceEstimator};
use crate::resilience::{MentalResilienceIndex, ResilienceClassification};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentScope {
    /// Compare runners of the same class only.
    #[default]
    PerClass,
    /// Pool every class that ran the same control pair.
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegResilience {
    /// Leg on which the mistake happened; the reaction is the following leg.
    pub mistake_leg: u32,
    pub index: MentalResilienceIndex,
    pub classification: ResilienceClassification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerAnalysis {
    pub person_id: PersonId,
    pub class_name: String,
    /// Median index over the runner's clean legs.
    pub baseline: Option<PerformanceIndex>,
    pub anomalies: Vec<AnomaliesIndex>,
    pub resilience: Vec<LegResilience>,
}

impl RunnerAnalysis {
    pub fn suspicious(&self) -> impl Iterator<Item = &AnomaliesIndex> {
        self.anomalies
            .iter()
            .filter(|index| index.classification.is_suspicious())
    }
}

#[derive(Debug, Clone)]
pub struct SplitAnalyzer {
    estimator: RobustReferenceEstimator,
    classifier: AnomalyClassifier,
    mistake_threshold: f64,
    resilience_tolerance: f64,
    scope: SegmentScope,
}

impl Default for SplitAnalyzer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default(), SegmentScope::default())
    }
}

struct ScoredLeg {
    leg_number: u32,
    key: SegmentKey,
    seconds: f64,
    reference: f64,
    index: Option<PerformanceIndex>,
}

impl SplitAnalyzer {
    pub fn from_config(config: &EngineConfig, scope: SegmentScope) -> Self {
        Self {
            estimator: config.reference,
            classifier: AnomalyClassifier::new(config.anomaly.clone()),
            mistake_threshold: config.mistake_threshold,
            resilience_tolerance: config.resilience_tolerance,
            scope,
        }
    }

    pub fn segment_key(&self, class_name: &str, from: &str, to: &str) -> SegmentKey {
        SegmentKey {
            class_name: match self.scope {
                SegmentScope::PerClass => Some(class_name.to_string()),
                SegmentScope::Global => None,
            },
            from_control: from.to_string(),
            to_control: to.to_string(),
        }
    }

    pub fn segment_references(&self, runners: &[RunnerSplits]) -> HashMap<SegmentKey, f64> {
        let mut samples: HashMap<SegmentKey, Vec<f64>> = HashMap::new();
        for runner in runners {
            for leg in &runner.legs {
                let key = self.segment_key(&runner.class_name, &leg.from_control, &leg.to_control);
                samples.entry(key).or_default().push(leg.seconds);
            }
        }

        samples
            .into_iter()
            .map(|(key, times)| {
                let reference = self.estimator.estimate(&times);
                debug!(segment = %key, samples = times.len(), reference, "segment reference");
                (key, reference)
            })
            .collect()
    }

    pub fn analyze(&self, runners: &[RunnerSplits]) -> Vec<RunnerAnalysis> {
        let references = self.segment_references(runners);
        let analyses: Vec<RunnerAnalysis> = runners
            .iter()
            .map(|runner| self.analyze_runner(runner, &references))
            .collect();

        let flagged: usize = analyses.iter().map(|a| a.suspicious().count()).sum();
        info!(
            event = "splits.analyzed",
            runners = runners.len(),
            segments = references.len(),
            flagged,
        );
        analyses
    }

    fn analyze_runner(
        &self,
        runner: &RunnerSplits,
        references: &HashMap<SegmentKey, f64>,
    ) -> RunnerAnalysis {
        let legs: Vec<ScoredLeg> = runner
            .legs
            .iter()
            .map(|leg| {
                let key = self.segment_key(&runner.class_name, &leg.from_control, &leg.to_control);
                let reference = references.get(&key).copied().unwrap_or(0.0);
                let index = match PerformanceIndex::of(leg.seconds, reference) {
                    Ok(index) => Some(index),
                    Err(err) => {
                        warn!(
                            person_id = %runner.person_id,
                            leg = leg.leg_number,
                            %err,
                            "leg not analysable"
                        );
                        None
                    }
                };
                ScoredLeg {
                    leg_number: leg.leg_number,
                    key,
                    seconds: leg.seconds,
                    reference,
                    index,
                }
            })
            .collect();

        let baseline = self.baseline(&legs);

        let anomalies = legs
            .iter()
            .map(|leg| match leg.index {
                Some(index) => AnomaliesIndex::new(
                    leg.leg_number,
                    leg.key.clone(),
                    index,
                    baseline,
                    leg.reference - leg.seconds,
                    leg.reference,
                    &self.classifier,
                ),
                None => AnomaliesIndex::no_data(leg.leg_number, leg.key.clone()),
            })
            .collect();

        let resilience = match baseline {
            Some(normal) => legs
                .windows(2)
                .filter_map(|pair| {
                    let mistake = pair[0].index?;
                    let reaction = pair[1].index?;
                    if !mistake.is_mistake_at(self.mistake_threshold) {
                        return None;
                    }
                    let index = MentalResilienceIndex::of(reaction, normal);
                    Some(LegResilience {
                        mistake_leg: pair[0].leg_number,
                        index,
                        classification: index.classify_with(self.resilience_tolerance),
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        RunnerAnalysis {
            person_id: runner.person_id,
            class_name: runner.class_name.clone(),
            baseline,
            anomalies,
            resilience,
        }
    }

    fn baseline(&self, legs: &[ScoredLeg]) -> Option<PerformanceIndex> {
        let all: Vec<f64> = legs
            .iter()
            .filter_map(|leg| leg.index.map(|index| index.value()))
            .collect();
        let mut clean: Vec<f64> = all
            .iter()
            .copied()
            .filter(|value| *value < self.mistake_threshold)
            .collect();
        if clean.is_empty() {
            clean = all;
        }
        if clean.is_empty() {
            return None;
        }
        clean.sort_by(f64::total_cmp);
        PerformanceIndex::new(median(&clean)).ok()
    }
}
