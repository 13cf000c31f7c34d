use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ScoringError};
use crate::models::{
    ClassResult, ClassResultShortName, Cup, CupScore, Organisation, OrganisationId,
    OrganisationMap, PersonOrganisations, PersonRaceResult, PersonResult,
};

use super::{finished_by_runtime, organisation_of, CupTypeCalculationStrategy};

/// Runtimes up to `max_ratio_percent` of the best time earn `points`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBand {
    pub max_ratio_percent: u32,
    pub points: u32,
}

/// Classes merged into one cup class. Members are compared without
/// whitespace and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBucket {
    pub canonical: String,
    pub members: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NorRules {
    pub skipped_classes: BTreeSet<String>,
    pub root_organisation: String,
    /// Evaluated in order; the first band that holds wins.
    pub bands: Vec<PointsBand>,
    pub fallback_points: u32,
    pub class_buckets: Vec<ClassBucket>,
}

fn names(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for NorRules {
    fn default() -> Self {
        let bands = [
            (100, 12),
            (105, 11),
            (110, 10),
            (115, 9),
            (120, 8),
            (125, 7),
            (135, 6),
            (150, 5),
            (170, 4),
            (200, 3),
            (300, 2),
        ]
        .into_iter()
        .map(|(max_ratio_percent, points)| PointsBand {
            max_ratio_percent,
            points,
        })
        .collect();

        Self {
            skipped_classes: names(&[
                "BK", "BL", "Beg", "Trim", "Beginner", "OffK", "OffL", "D/H-12 Be",
                "D/H-10", "D-10", "H-10", "D-12", "H-12", "Offen", "Direkt", "Familie",
                "Staffel",
            ]),
            root_organisation: "NOR".to_string(),
            bands,
            fallback_points: 1,
            class_buckets: vec![
                ClassBucket {
                    canonical: "H lang".to_string(),
                    members: names(&["H19", "H20", "H21", "H21A", "H21E", "H35", "H40", "H45"]),
                },
                ClassBucket {
                    canonical: "H kurz".to_string(),
                    members: names(&[
                        "H21K", "H21B", "H50", "H55", "H60", "H65", "H70", "H75", "H80",
                    ]),
                },
                ClassBucket {
                    canonical: "D lang".to_string(),
                    members: names(&["D19", "D20", "D21", "D21A", "D21E", "D35", "D40"]),
                },
                ClassBucket {
                    canonical: "D kurz".to_string(),
                    members: names(&[
                        "D21K", "D21B", "D45", "D50", "D55", "D60", "D65", "D70", "D75", "D80",
                    ]),
                },
            ],
        }
    }
}

/// Regional cup for members of the NOR association. Points follow the
/// runtime's ratio to the class winner.
#[derive(Debug, Clone)]
pub struct NorStrategy {
    rules: NorRules,
    organisations: Option<Arc<OrganisationMap>>,
    root: Option<OrganisationId>,
}

impl NorStrategy {
    pub fn new(rules: NorRules) -> Self {
        Self {
            rules,
            organisations: None,
            root: None,
        }
    }

    /// Attaches the organisation tree and resolves the root association by
    /// short name.
    pub fn with_organisations(mut self, organisations: Arc<OrganisationMap>) -> Self {
        self.root = organisations
            .values()
            .find(|org| org.short_name == self.rules.root_organisation)
            .map(|org| org.id);
        if self.root.is_none() {
            warn!(
                root = %self.rules.root_organisation,
                "root organisation not found, no organisation is eligible"
            );
        }
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

    pub fn calculate_nor_points(&self, best_time: u64, current_time: u64) -> Result<u32> {
        if current_time < best_time {
            return Err(ScoringError::InconsistentTimes {
                best: best_time,
                current: current_time,
            });
        }
        let scaled_current = u128::from(current_time) * 100;
        let points = self
            .rules
            .bands
            .iter()
            .find(|band| {
                scaled_current <= u128::from(best_time) * u128::from(band.max_ratio_percent)
            })
            .map(|band| band.points)
            .unwrap_or(self.rules.fallback_points);
        Ok(points)
    }
}

impl CupTypeCalculationStrategy for NorStrategy {
    fn name(&self) -> &'static str {
        "NOR"
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
        !person_result.race_results.is_empty()
            && person_result.race_results.iter().all(PersonRaceResult::is_finished)
    }

    fn valid_organisation(&self, organisation: &Organisation) -> Result<bool> {
        let organisations = self.required_organisations()?;
        let Some(root) = self.root.and_then(|id| organisations.get(&id)) else {
            return Ok(false);
        };
        Ok(root.contains(organisation.id, organisations))
    }

    fn calculate(
        &self,
        _cup: &Cup,
        results: &[PersonRaceResult],
        person_to_organisation: &PersonOrganisations,
    ) -> Result<Vec<CupScore>> {
        let finished = finished_by_runtime(results);
        let Some(&(_, best_time)) = finished.first() else {
            return Ok(Vec::new());
        };

        let mut scores = Vec::with_capacity(finished.len());
        for (result, runtime) in finished {
            let Some(organisation_id) = organisation_of(result, person_to_organisation) else {
                continue;
            };
            let points = self.calculate_nor_points(best_time, runtime)?;
            scores.push(CupScore {
                person_id: result.person_id,
                organisation_id,
                class_result_short_name: self
                    .harmonize_class_result_short_name(&result.class_short_name),
                points,
            });
        }

        debug!(best_time, scored = scores.len(), "nor points assigned");
        Ok(scores)
    }

    fn best_of_races_count(&self, races_count: usize) -> usize {
        races_count / 2 + 1
    }

    fn harmonize_class_result_short_name(
        &self,
        name: &ClassResultShortName,
    ) -> ClassResultShortName {
        let compact: String = name
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        self.rules
            .class_buckets
            .iter()
            .find(|bucket| bucket.members.contains(&compact))
            .map(|bucket| ClassResultShortName(bucket.canonical.clone()))
            .unwrap_or_else(|| name.clone())
    }
}
