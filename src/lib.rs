pub mod analysis;
pub mod anomaly;
pub mod config;
pub mod cup;
pub mod error;
pub mod import;
pub mod models;
pub mod performance;
pub mod reference;
pub mod report;
pub mod resilience;
pub mod telemetry;

pub use analysis::{LegResilience, RunnerAnalysis, SegmentScope, SplitAnalyzer};
pub use anomaly::{
    AnomaliesIndex, AnomalyClassification, AnomalyClassifier, AnomalyThresholds, SuspicionTier,
};
pub use config::EngineConfig;
pub use cup::{
    aggregate_standings, calculate_cup, score_race, strategy_for, AddStrategy,
    CupTypeCalculationStrategy, KristallRules, KristallStrategy, NorRules, NorStrategy,
};
pub use error::{Result, ScoringError};
pub use models::{
    ClassResult, ClassResultShortName, Cup, CupScore, CupStanding, CupType, LegSplit,
    Organisation, OrganisationId, OrganisationMap, PersonId, PersonOrganisations,
    PersonRaceResult, PersonResult, RaceResults, ResultStatus, RunnerSplits, SegmentKey,
};
pub use performance::PerformanceIndex;
pub use reference::RobustReferenceEstimator;
pub use resilience::{MentalResilienceIndex, ResilienceClassification};
