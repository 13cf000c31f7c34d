use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScoringError};
use crate::models::{
    ClassResult, Cup, CupScore, Organisation, OrganisationMap, PersonOrganisations,
    PersonRaceResult, PersonResult,
};

use super::{finished_by_runtime, organisation_of, CupTypeCalculationStrategy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KristallRules {
    pub skipped_classes: BTreeSet<String>,
    /// An organisation whose short name (or whose parent's) contains one of
    /// these is not eligible.
    pub excluded_organisation_fragments: Vec<String>,
    pub max_points: u32,
    pub min_points: u32,
}

impl Default for KristallRules {
    fn default() -> Self {
        Self {
            skipped_classes: [
                "BK", "BL", "Beg", "Trim", "Beginner", "OffK", "OffL", "D/H-12 Be",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            excluded_organisation_fragments: ["ohne", "Volkssport", "Volkssport Berlin"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_points: 10,
            min_points: 1,
        }
    }
}

/// Club cup: the fastest runner of each organisation scores, and runners
/// sharing a time share their points.
#[derive(Debug, Clone)]
pub struct KristallStrategy {
    rules: KristallRules,
    organisations: Option<Arc<OrganisationMap>>,
}

impl KristallStrategy {
    pub fn new(rules: KristallRules) -> Self {
        Self {
            rules,
            organisations: None,
        }
    }

    pub fn with_organisations(mut self, organisations: Arc<OrganisationMap>) -> Self {
        self.organisations = Some(organisations);
        self
    }

    fn required_organisations(&self) -> Result<&OrganisationMap> {
        self.organisations
            .as_deref()
            .ok_or(ScoringError::MissingOrganisations {
                strategy: self.name(),
            })
    }

    fn is_excluded_name(&self, short_name: &str) -> bool {
        self.rules
            .excluded_organisation_fragments
            .iter()
            .any(|fragment| short_name.contains(fragment.as_str()))
    }
}

impl CupTypeCalculationStrategy for KristallStrategy {
    fn name(&self) -> &'static str {
        "Kristall"
    }

    fn organisation_map(&self) -> Result<Option<&OrganisationMap>> {
        self.required_organisations().map(Some)
    }

    fn valid_class_result(&self, class_result: &ClassResult) -> bool {
        !self
            .rules
            .skipped_classes
            .contains(class_result.short_name.as_str())
    }

    fn valid_person_result(&self, person_result: &PersonResult) -> bool {
        person_result.race_results.iter().any(PersonRaceResult::is_finished)
    }

    fn valid_organisation(&self, organisation: &Organisation) -> Result<bool> {
        let organisations = self.required_organisations()?;

        if self.is_excluded_name(&organisation.short_name) {
            return Ok(false);
        }
        let excluded_parent = Organisation::ancestors(organisation.id, organisations)
            .iter()
            .any(|parent| self.is_excluded_name(&parent.short_name));
        Ok(!excluded_parent)
    }

    fn calculate(
        &self,
        _cup: &Cup,
        results: &[PersonRaceResult],
        person_to_organisation: &PersonOrganisations,
    ) -> Result<Vec<CupScore>> {
        let mut seen_organisations = HashSet::new();
        let mut scores = Vec::new();

        let mut points = self.rules.max_points;
        let mut group_time: Option<u64> = None;
        let mut group_size: u32 = 0;

        for (result, runtime) in finished_by_runtime(results) {
            let Some(organisation_id) = organisation_of(result, person_to_organisation) else {
                continue;
            };
            if !seen_organisations.insert(organisation_id) {
                continue;
            }

            if group_time != Some(runtime) {
                if group_time.is_some() {
                    points = points.saturating_sub(group_size).max(self.rules.min_points);
                }
                group_time = Some(runtime);
                group_size = 0;
            }
            group_size += 1;

            scores.push(CupScore {
                person_id: result.person_id,
                organisation_id,
                class_result_short_name: result.class_short_name.clone(),
                points,
            });
        }

        debug!(scored = scores.len(), "kristall points assigned");
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cup::fixtures::*;
    use crate::models::{CupType, OrganisationId, PersonId, ResultStatus};

    fn strategy() -> KristallStrategy {
        KristallStrategy::new(KristallRules::default())
    }

    fn class(short_name: &str) -> ClassResult {
        ClassResult {
            short_name: short_name.into(),
            name: short_name.to_string(),
            person_results: vec![],
        }
    }

    /// Each entry is `(runtime, organisation slot)`.
    fn scored(runtimes: &[(u64, usize)]) -> (Vec<PersonRaceResult>, PersonOrganisations) {
        let orgs: Vec<OrganisationId> =
            (0..runtimes.len()).map(|_| OrganisationId::new()).collect();
        let mut person_to_organisation = PersonOrganisations::new();
        let results = runtimes
            .iter()
            .map(|(runtime, org_index)| {
                let result = race_result("H21", Some(*runtime));
                person_to_organisation.insert(result.person_id, orgs[*org_index]);
                result
            })
            .collect();
        (results, person_to_organisation)
    }

    fn points(runtimes: &[(u64, usize)]) -> Vec<u32> {
        let (results, person_to_organisation) = scored(runtimes);
        strategy()
            .calculate(&cup(CupType::Kristall), &results, &person_to_organisation)
            .expect("kristall scoring")
            .iter()
            .map(|score| score.points)
            .collect()
    }

    #[test]
    fn tied_runners_share_points() {
        assert_eq!(points(&[(100, 0), (100, 1), (105, 2)]), vec![10, 10, 8]);
    }

    #[test]
    fn distinct_times_step_down_by_group_size() {
        assert_eq!(points(&[(100, 0), (101, 1), (102, 2), (103, 3)]), vec![10, 9, 8, 7]);
        assert_eq!(
            points(&[(100, 0), (100, 1), (100, 2), (110, 3), (120, 4)]),
            vec![10, 10, 10, 7, 6]
        );
    }

    #[test]
    fn points_never_drop_below_one() {
        let runtimes: Vec<(u64, usize)> = (0..14).map(|i| (100 + i as u64, i)).collect();
        let all = points(&runtimes);
        assert_eq!(&all[..10], &[10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert!(all[10..].iter().all(|p| *p == 1));
    }

    #[test]
    fn only_fastest_runner_per_organisation_scores() {
        let (results, person_to_organisation) = scored(&[(100, 0), (102, 0), (104, 1)]);
        let scores = strategy()
            .calculate(&cup(CupType::Kristall), &results, &person_to_organisation)
            .expect("kristall scoring");
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].person_id, results[0].person_id);
        assert_eq!(scores[1].person_id, results[2].person_id);
        assert_eq!(scores[1].points, 9);
    }

    #[test]
    fn unfinished_and_unaffiliated_results_are_skipped() {
        let (mut results, person_to_organisation) = scored(&[(100, 0), (110, 1)]);
        results[0].status = ResultStatus::MissingPunch;
        results.push(PersonRaceResult {
            person_id: PersonId::new(),
            ..race_result("H21", Some(90))
        });
        let scores = strategy()
            .calculate(&cup(CupType::Kristall), &results, &person_to_organisation)
            .expect("kristall scoring");
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].points, 10);
    }

    #[test]
    fn empty_input_scores_nothing() {
        let scores = strategy()
            .calculate(&cup(CupType::Kristall), &[], &PersonOrganisations::new())
            .expect("kristall scoring");
        assert!(scores.is_empty());
    }

    #[test]
    fn beginner_and_open_classes_are_skipped() {
        let strategy = strategy();
        for skipped in ["BK", "BL", "Beg", "Trim", "Beginner", "OffK", "OffL", "D/H-12 Be"] {
            assert!(!strategy.valid_class_result(&class(skipped)), "{skipped}");
        }
        assert!(strategy.valid_class_result(&class("H21")));
        assert!(strategy.valid_class_result(&class("D-14")));
    }

    #[test]
    fn person_needs_a_finished_race() {
        let mut finished = race_result("H21", Some(100));
        let person = PersonResult {
            person_id: finished.person_id,
            class_short_name: "H21".into(),
            race_results: vec![finished.clone()],
        };
        assert!(strategy().valid_person_result(&person));

        finished.status = ResultStatus::Dns;
        let not_started = PersonResult {
            race_results: vec![finished],
            ..person
        };
        assert!(!strategy().valid_person_result(&not_started));
    }

    #[test]
    fn organisation_fragments_match_substrings() {
        let independent = organisation("ohne Verein", vec![]);
        let volkssport = organisation("TSV Volkssport", vec![]);
        let club = organisation("OLV Potsdam", vec![]);
        let map = organisation_map(&[&independent, &volkssport, &club]);
        let strategy = strategy().with_organisations(map);

        assert_eq!(strategy.valid_organisation(&independent), Ok(false));
        assert_eq!(strategy.valid_organisation(&volkssport), Ok(false));
        assert_eq!(strategy.valid_organisation(&club), Ok(true));
    }

    #[test]
    fn excluded_parent_excludes_children() {
        let section = organisation("Gruppe Nord", vec![]);
        let parent = organisation("Volkssport Berlin", vec![section.id]);
        let map = organisation_map(&[&section, &parent]);
        let strategy = strategy().with_organisations(map);
        assert_eq!(strategy.valid_organisation(&section), Ok(false));
    }

    #[test]
    fn any_excluded_parent_excludes_member() {
        for _ in 0..8 {
            let club = organisation("OLV Potsdam", vec![]);
            let region = organisation("Brandenburg", vec![club.id]);
            let volkssport = organisation("Volkssport Berlin", vec![club.id]);
            let map = organisation_map(&[&club, &region, &volkssport]);
            let strategy = strategy().with_organisations(map);
            assert_eq!(strategy.valid_organisation(&club), Ok(false));
        }
    }

    #[test]
    fn organisation_check_requires_map() {
        let club = organisation("OLV Potsdam", vec![]);
        assert_eq!(
            strategy().valid_organisation(&club),
            Err(ScoringError::MissingOrganisations {
                strategy: "Kristall"
            })
        );
    }
}
