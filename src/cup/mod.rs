use std::sync::Arc;

use tracing::warn;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{
    ClassResult, ClassResultShortName, Cup, CupScore, CupType, Organisation, OrganisationId,
    OrganisationMap, PersonOrganisations, PersonRaceResult, PersonResult,
};

pub mod add;
pub mod kristall;
pub mod nor;
pub mod standings;

pub use add::AddStrategy;
pub use kristall::{KristallRules, KristallStrategy};
pub use nor::{ClassBucket, NorRules, NorStrategy, PointsBand};
pub use standings::{aggregate_standings, calculate_cup, score_race};

pub trait CupTypeCalculationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn valid_class_result(&self, class_result: &ClassResult) -> bool;

    fn valid_person_result(&self, person_result: &PersonResult) -> bool;

    /// Fails when the strategy needs the organisation tree and none was given.
    fn valid_organisation(&self, organisation: &Organisation) -> Result<bool>;

    /// Tree used to resolve a person's organisation. Strategies that check
    /// membership fail here when no tree is attached.
    fn organisation_map(&self) -> Result<Option<&OrganisationMap>> {
        Ok(None)
    }

    /// Points for one class of one race. `results` are expected in ascending
    /// runtime order.
    fn calculate(
        &self,
        cup: &Cup,
        results: &[PersonRaceResult],
        person_to_organisation: &PersonOrganisations,
    ) -> Result<Vec<CupScore>>;

    fn best_of_races_count(&self, races_count: usize) -> usize {
        races_count
    }

    fn harmonize_class_result_short_name(
        &self,
        name: &ClassResultShortName,
    ) -> ClassResultShortName {
        name.clone()
    }
}

pub fn strategy_for(
    cup_type: CupType,
    config: &EngineConfig,
    organisations: Option<Arc<OrganisationMap>>,
) -> Box<dyn CupTypeCalculationStrategy> {
    match cup_type {
        CupType::Add => Box::new(AddStrategy),
        CupType::Kristall => {
            let strategy = KristallStrategy::new(config.kristall.clone());
            match organisations {
                Some(map) => Box::new(strategy.with_organisations(map)),
                None => Box::new(strategy),
            }
        }
        CupType::Nor => {
            let strategy = NorStrategy::new(config.nor.clone());
            match organisations {
                Some(map) => Box::new(strategy.with_organisations(map)),
                None => Box::new(strategy),
            }
        }
    }
}

/// Finished results paired with their runtime, stably sorted fastest first.
pub(crate) fn finished_by_runtime(results: &[PersonRaceResult]) -> Vec<(&PersonRaceResult, u64)> {
    let mut finished: Vec<(&PersonRaceResult, u64)> = results
        .iter()
        .filter(|result| result.is_finished())
        .filter_map(|result| result.effective_runtime().map(|runtime| (result, runtime)))
        .collect();
    finished.sort_by_key(|(_, runtime)| *runtime);
    finished
}

pub(crate) fn organisation_of(
    result: &PersonRaceResult,
    person_to_organisation: &PersonOrganisations,
) -> Option<OrganisationId> {
    let organisation = person_to_organisation.get(&result.person_id).copied();
    if organisation.is_none() {
        warn!(person_id = %result.person_id, "result without organisation skipped");
    }
    organisation
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::{PersonId, ResultStatus};

    pub fn cup(cup_type: CupType) -> Cup {
        Cup {
            name: "Berlin-Brandenburg Cup".to_string(),
            year: 2026,
            cup_type,
            best_of_races: None,
        }
    }

    pub fn race_result(class: &str, runtime: Option<u64>) -> PersonRaceResult {
        PersonRaceResult {
            person_id: PersonId::new(),
            race_number: 1,
            class_short_name: class.into(),
            start_time: None,
            finish_time: None,
            runtime,
            position: None,
            status: ResultStatus::Ok,
        }
    }

    pub fn organisation(short_name: &str, children: Vec<OrganisationId>) -> Organisation {
        Organisation {
            id: OrganisationId::new(),
            short_name: short_name.to_string(),
            name: short_name.to_string(),
            children,
        }
    }

    pub fn organisation_map(organisations: &[&Organisation]) -> Arc<OrganisationMap> {
        Arc::new(
            organisations
                .iter()
                .map(|org| (org.id, (*org).clone()))
                .collect(),
        )
    }
}
