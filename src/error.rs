/// Errors raised by the engine. All of them signal bad input or a broken
/// caller contract; none are retried internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("Best time must be positive (got {0})")]
    InvalidBestTime(f64),

    #[error("Runner time must be non-negative (got {0})")]
    InvalidRunnerTime(f64),

    #[error("performance index must be a finite non-negative number (got {0})")]
    InvalidIndexValue(f64),

    #[error("{strategy} strategy requires an organisation map")]
    MissingOrganisations { strategy: &'static str },

    #[error("current time {current}s is faster than best time {best}s")]
    InconsistentTimes { best: u64, current: u64 },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ScoringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            ScoringError::InvalidBestTime(0.0).to_string(),
            "Best time must be positive (got 0)"
        );
        assert_eq!(
            ScoringError::InvalidRunnerTime(-1.5).to_string(),
            "Runner time must be non-negative (got -1.5)"
        );
        assert_eq!(
            ScoringError::InconsistentTimes {
                best: 100,
                current: 90
            }
            .to_string(),
            "current time 90s is faster than best time 100s"
        );
    }

    #[test]
    fn missing_organisations_names_strategy() {
        let err = ScoringError::MissingOrganisations { strategy: "NOR" };
        assert!(err.to_string().starts_with("NOR strategy"));
    }
}
