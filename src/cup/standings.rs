use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{
    ClassResultShortName, Cup, CupScore, CupStanding, OrganisationId,
    PersonId, PersonOrganisations, PersonRaceResult, RaceResults,
};

use super::CupTypeCalculationStrategy;

/// Scores one race: filters eligible classes, people and organisations,
/// merges classes that harmonise to the same cup class, and scores each
/// merged class fastest first. Organisations resolve through the strategy's
/// own tree.
pub fn score_race(
    strategy: &dyn CupTypeCalculationStrategy,
    cup: &Cup,
    race: &RaceResults,
    person_to_organisation: &PersonOrganisations,
) -> Result<Vec<CupScore>> {
    let organisations = strategy.organisation_map()?;
    let mut classes: BTreeMap<ClassResultShortName, Vec<PersonRaceResult>> = BTreeMap::new();

    for class_result in &race.class_results {
        if !strategy.valid_class_result(class_result) {
            debug!(class = %class_result.short_name, "class not part of cup");
            continue;
        }
        let cup_class = strategy.harmonize_class_result_short_name(&class_result.short_name);

        for person_result in &class_result.person_results {
            if !strategy.valid_person_result(person_result) {
                continue;
            }
            let Some(organisation) = person_to_organisation
                .get(&person_result.person_id)
                .and_then(|id| organisations?.get(id))
            else {
                warn!(person_id = %person_result.person_id, "no organisation for person");
                continue;
            };
            if !strategy.valid_organisation(organisation)? {
                continue;
            }
            classes.entry(cup_class.clone()).or_default().extend(
                person_result
                    .race_results
                    .iter()
                    .filter(|result| result.race_number == race.race_number)
                    .cloned(),
            );
        }
    }

    let mut scores = Vec::new();
    for (cup_class, mut results) in classes {
        results.sort_by_key(|result| result.effective_runtime().unwrap_or(u64::MAX));
        let class_scores = strategy.calculate(cup, &results, person_to_organisation)?;
        debug!(
            race = race.race_number,
            class = %cup_class,
            scored = class_scores.len(),
            "class scored"
        );
        scores.extend(class_scores);
    }
    Ok(scores)
}

/// Sums the best races of every person per cup class. Races are given as
/// `(race_number, scores)`.
pub fn aggregate_standings(
    strategy: &dyn CupTypeCalculationStrategy,
    cup: &Cup,
    race_scores: &[(u32, Vec<CupScore>)],
) -> Vec<CupStanding> {
    let best_of = cup
        .best_of_races
        .unwrap_or_else(|| strategy.best_of_races_count(race_scores.len()));

    struct Entry {
        organisation_id: OrganisationId,
        race_points: Vec<(u32, u32)>,
    }

    let mut entries: HashMap<(PersonId, ClassResultShortName), Entry> = HashMap::new();
    for (race_number, scores) in race_scores {
        for score in scores {
            let entry = entries
                .entry((score.person_id, score.class_result_short_name.clone()))
                .or_insert_with(|| Entry {
                    organisation_id: score.organisation_id,
                    race_points: Vec::new(),
                });
            entry.organisation_id = score.organisation_id;
            entry.race_points.push((*race_number, score.points));
        }
    }

    let mut standings: Vec<CupStanding> = entries
        .into_iter()
        .map(|((person_id, class), mut entry)| {
            entry.race_points.sort_by_key(|(race, _)| *race);
            let mut best: Vec<u32> = entry.race_points.iter().map(|(_, p)| *p).collect();
            best.sort_unstable_by(|a, b| b.cmp(a));
            best.truncate(best_of);
            CupStanding {
                person_id,
                organisation_id: entry.organisation_id,
                class_result_short_name: class,
                total_points: best.iter().sum(),
                counted_races: best.len(),
                race_points: entry.race_points,
            }
        })
        .collect();

    standings.sort_by(|a, b| {
        a.class_result_short_name
            .cmp(&b.class_result_short_name)
            .then(b.total_points.cmp(&a.total_points))
            .then(a.person_id.cmp(&b.person_id))
    });
    standings
}

/// Scores every race and aggregates the season.
pub fn calculate_cup(
    strategy: &dyn CupTypeCalculationStrategy,
    cup: &Cup,
    races: &[RaceResults],
    person_to_organisation: &PersonOrganisations,
) -> Result<Vec<CupStanding>> {
    let mut race_scores = Vec::with_capacity(races.len());
    for race in races {
        let scores = score_race(strategy, cup, race, person_to_organisation)?;
        race_scores.push((race.race_number, scores));
    }
    let standings = aggregate_standings(strategy, cup, &race_scores);
    info!(
        event = "cup.calculated",
        cup = %cup.name,
        cup_type = %cup.cup_type,
        races = races.len(),
        standings = standings.len(),
    );
    Ok(standings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cup::fixtures::*;
    use crate::config::EngineConfig;
    use crate::cup::{
        strategy_for, AddStrategy, KristallRules, KristallStrategy, NorRules, NorStrategy,
    };
    use crate::error::ScoringError;
    use crate::models::{ClassResult, CupType, PersonResult};

    fn score(person_id: PersonId, class: &str, points: u32) -> CupScore {
        CupScore {
            person_id,
            organisation_id: OrganisationId(uuid::Uuid::nil()),
            class_result_short_name: class.into(),
            points,
        }
    }

    fn class_result(short_name: &str, results: &[PersonRaceResult]) -> ClassResult {
        ClassResult {
            short_name: short_name.into(),
            name: short_name.to_string(),
            person_results: results
                .iter()
                .map(|result| PersonResult {
                    person_id: result.person_id,
                    class_short_name: short_name.into(),
                    race_results: vec![result.clone()],
                })
                .collect(),
        }
    }

    #[test]
    fn best_races_are_summed() {
        let runner = PersonId::new();
        let races = vec![
            (1, vec![score(runner, "H21", 12)]),
            (2, vec![score(runner, "H21", 4)]),
            (3, vec![score(runner, "H21", 9)]),
        ];
        let nor = NorStrategy::new(NorRules::default());
        let standings = aggregate_standings(&nor, &cup(CupType::Nor), &races);

        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].total_points, 21);
        assert_eq!(standings[0].counted_races, 2);
        assert_eq!(standings[0].race_points, vec![(1, 12), (2, 4), (3, 9)]);
    }

    #[test]
    fn cup_override_wins_over_strategy_rule() {
        let runner = PersonId::new();
        let races = vec![
            (1, vec![score(runner, "H21", 10)]),
            (2, vec![score(runner, "H21", 8)]),
            (3, vec![score(runner, "H21", 6)]),
        ];
        let mut cup = cup(CupType::Kristall);
        cup.best_of_races = Some(1);
        let kristall = KristallStrategy::new(KristallRules::default());
        let standings = aggregate_standings(&kristall, &cup, &races);
        assert_eq!(standings[0].total_points, 10);
    }

    #[test]
    fn standings_are_ordered_per_class_by_points() {
        let (a, b, c) = (PersonId::new(), PersonId::new(), PersonId::new());
        let races = vec![(
            1,
            vec![score(a, "H21", 5), score(b, "H21", 9), score(c, "D21", 7)],
        )];
        let standings = aggregate_standings(&AddStrategy, &cup(CupType::Add), &races);
        let order: Vec<(PersonId, u32)> = standings
            .iter()
            .map(|standing| (standing.person_id, standing.total_points))
            .collect();
        assert_eq!(order, vec![(c, 7), (b, 9), (a, 5)]);
    }

    #[test]
    fn score_race_filters_and_sorts() {
        let club_a = organisation("OLV Potsdam", vec![]);
        let club_b = organisation("SG Berlin", vec![]);
        let independent = organisation("ohne Verein", vec![]);
        let map = organisation_map(&[&club_a, &club_b, &independent]);

        let slow = race_result("H21", Some(105));
        let fast = race_result("H21", Some(100));
        let unaffiliated = race_result("H21", Some(90));
        let beginner = race_result("Beg", Some(50));
        let person_to_organisation: PersonOrganisations = [
            (slow.person_id, club_a.id),
            (fast.person_id, club_b.id),
            (unaffiliated.person_id, independent.id),
            (beginner.person_id, club_a.id),
        ]
        .into_iter()
        .collect();

        let race = RaceResults {
            race_number: 1,
            class_results: vec![
                class_result("H21", &[slow.clone(), unaffiliated, fast.clone()]),
                class_result("Beg", &[beginner]),
            ],
        };
        let kristall =
            KristallStrategy::new(KristallRules::default()).with_organisations(map);
        let scores = score_race(&kristall, &cup(CupType::Kristall), &race, &person_to_organisation)
            .expect("race scored");

        let points: Vec<(PersonId, u32)> =
            scores.iter().map(|s| (s.person_id, s.points)).collect();
        assert_eq!(points, vec![(fast.person_id, 10), (slow.person_id, 9)]);
    }

    #[test]
    fn score_race_merges_harmonised_classes() {
        let root = organisation("NOR", vec![]);
        let map = organisation_map(&[&root]);
        let h21 = race_result("H21", Some(1000));
        let h35 = race_result("H35", Some(900));
        let person_to_organisation: PersonOrganisations =
            [(h21.person_id, root.id), (h35.person_id, root.id)].into_iter().collect();
        let race = RaceResults {
            race_number: 1,
            class_results: vec![
                class_result("H21", &[h21.clone()]),
                class_result("H35", &[h35.clone()]),
            ],
        };

        let nor = NorStrategy::new(NorRules::default()).with_organisations(map);
        let scores = score_race(&nor, &cup(CupType::Nor), &race, &person_to_organisation)
            .expect("race scored");
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].person_id, h35.person_id);
        assert_eq!(scores[0].points, 12);
        assert_eq!(scores[1].person_id, h21.person_id);
        assert_eq!(scores[1].points, 9);
    }

    #[test]
    fn missing_map_surfaces_as_error() {
        let club = organisation("OLV Potsdam", vec![]);
        let result = race_result("H21", Some(100));
        let person_to_organisation: PersonOrganisations =
            [(result.person_id, club.id)].into_iter().collect();
        let race = RaceResults {
            race_number: 1,
            class_results: vec![class_result("H21", &[result])],
        };
        let kristall = KristallStrategy::new(KristallRules::default());
        let scored = score_race(&kristall, &cup(CupType::Kristall), &race, &person_to_organisation);
        assert_eq!(
            scored,
            Err(ScoringError::MissingOrganisations {
                strategy: "Kristall"
            })
        );
    }

    #[test]
    fn cup_without_organisation_tree_fails() {
        let config = EngineConfig::default();
        let result = race_result("H21", Some(100));
        let person_to_organisation: PersonOrganisations =
            [(result.person_id, OrganisationId::new())].into_iter().collect();
        let races = vec![RaceResults {
            race_number: 1,
            class_results: vec![class_result("H21", &[result])],
        }];

        for (cup_type, name) in [(CupType::Kristall, "Kristall"), (CupType::Nor, "NOR")] {
            let strategy = strategy_for(cup_type, &config, None);
            let standings =
                calculate_cup(strategy.as_ref(), &cup(cup_type), &races, &person_to_organisation);
            assert_eq!(
                standings,
                Err(ScoringError::MissingOrganisations { strategy: name })
            );
        }
    }

    #[test]
    fn unknown_organisation_is_skipped_when_tree_is_attached() {
        let club = organisation("OLV Potsdam", vec![]);
        let map = organisation_map(&[&club]);
        let result = race_result("H21", Some(100));
        let person_to_organisation: PersonOrganisations =
            [(result.person_id, OrganisationId::new())].into_iter().collect();
        let race = RaceResults {
            race_number: 1,
            class_results: vec![class_result("H21", &[result])],
        };
        let kristall = KristallStrategy::new(KristallRules::default()).with_organisations(map);
        let scores = score_race(&kristall, &cup(CupType::Kristall), &race, &person_to_organisation)
            .expect("race scored");
        assert!(scores.is_empty());
    }

    #[test]
    fn add_cup_has_no_standings() {
        let club = organisation("OLV Potsdam", vec![]);
        let result = race_result("H21", Some(100));
        let person_to_organisation: PersonOrganisations =
            [(result.person_id, club.id)].into_iter().collect();
        let races = vec![RaceResults {
            race_number: 1,
            class_results: vec![class_result("H21", &[result])],
        }];
        let standings =
            calculate_cup(&AddStrategy, &cup(CupType::Add), &races, &person_to_organisation)
                .expect("add cup");
        assert!(standings.is_empty());
    }
}
