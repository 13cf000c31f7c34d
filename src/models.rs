use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganisationId(pub Uuid);

/// Short class label as printed on result lists, e.g. `H21` or `D-14`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassResultShortName(pub String);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl OrganisationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrganisationId {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassResultShortName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClassResultShortName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for OrganisationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ClassResultShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Ok,
    Dnf,
    Dns,
    MissingPunch,
    Disqualified,
    OverTime,
    NotCompeting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonRaceResult {
    pub person_id: PersonId,
    pub race_number: u32,
    pub class_short_name: ClassResultShortName,
    pub start_time: Option<NaiveDateTime>,
    pub finish_time: Option<NaiveDateTime>,
    /// Runtime in seconds.
    pub runtime: Option<u64>,
    pub position: Option<u32>,
    pub status: ResultStatus,
}

impl PersonRaceResult {
    /// Runtime in seconds, falling back to the punch times when the runtime
    /// column was not filled in.
    pub fn effective_runtime(&self) -> Option<u64> {
        if self.runtime.is_some() {
            return self.runtime;
        }
        let (start, finish) = (self.start_time?, self.finish_time?);
        let seconds = (finish - start).num_seconds();
        u64::try_from(seconds).ok()
    }

    pub fn is_finished(&self) -> bool {
        self.status == ResultStatus::Ok && self.effective_runtime().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonResult {
    pub person_id: PersonId,
    pub class_short_name: ClassResultShortName,
    pub race_results: Vec<PersonRaceResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassResult {
    pub short_name: ClassResultShortName,
    pub name: String,
    pub person_results: Vec<PersonResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceResults {
    pub race_number: u32,
    pub class_results: Vec<ClassResult>,
}

/// Node of the organisation tree. Children are referenced by id and resolved
/// through an [`OrganisationMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: OrganisationId,
    pub short_name: String,
    pub name: String,
    pub children: Vec<OrganisationId>,
}

pub type OrganisationMap = HashMap<OrganisationId, Organisation>;
pub type PersonOrganisations = HashMap<PersonId, OrganisationId>;

impl Organisation {
    /// True when `candidate` is this organisation or any of its descendants.
    pub fn contains(&self, candidate: OrganisationId, organisations: &OrganisationMap) -> bool {
        let mut pending = vec![self.id];
        let mut visited = Vec::new();
        while let Some(current) = pending.pop() {
            if current == candidate {
                return true;
            }
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            if let Some(org) = organisations.get(&current) {
                pending.extend(org.children.iter().copied());
            }
        }
        false
    }

    /// Every organisation that lists `id` as a direct or indirect child,
    /// nearest level first and ordered by id within a level. An organisation
    /// with several parents yields all of them.
    pub fn ancestors<'a>(
        id: OrganisationId,
        organisations: &'a OrganisationMap,
    ) -> Vec<&'a Organisation> {
        let mut chain: Vec<&Organisation> = Vec::new();
        let mut level = vec![id];
        while !level.is_empty() {
            let mut parents: Vec<&Organisation> = organisations
                .values()
                .filter(|org| org.id != id && level.iter().any(|c| org.children.contains(c)))
                .filter(|org| !chain.iter().any(|seen| seen.id == org.id))
                .collect();
            parents.sort_by_key(|org| org.id);
            level = parents.iter().map(|org| org.id).collect();
            chain.extend(parents);
        }
        chain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CupType {
    Add,
    Kristall,
    Nor,
}

impl fmt::Display for CupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CupType::Add => "Add",
            CupType::Kristall => "Kristall",
            CupType::Nor => "NOR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cup {
    pub name: String,
    pub year: i32,
    pub cup_type: CupType,
    /// Overrides the strategy's best-of-N rule when set.
    pub best_of_races: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CupScore {
    pub person_id: PersonId,
    pub organisation_id: OrganisationId,
    pub class_result_short_name: ClassResultShortName,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CupStanding {
    pub person_id: PersonId,
    pub organisation_id: OrganisationId,
    pub class_result_short_name: ClassResultShortName,
    pub total_points: u32,
    pub counted_races: usize,
    /// Points per race number, in race order.
    pub race_points: Vec<(u32, u32)>,
}

/// Comparable timing segment. `class_name == None` pools all classes that
/// ran the same control pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SegmentKey {
    pub class_name: Option<String>,
    pub from_control: String,
    pub to_control: String,
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class) => write!(f, "{} {}-{}", class, self.from_control, self.to_control),
            None => write!(f, "{}-{}", self.from_control, self.to_control),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegSplit {
    pub leg_number: u32,
    pub from_control: String,
    pub to_control: String,
    pub seconds: f64,
}

/// Split times of one runner on one race, legs in course order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSplits {
    pub person_id: PersonId,
    pub class_name: String,
    pub legs: Vec<LegSplit>,
}
