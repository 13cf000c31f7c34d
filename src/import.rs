use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    ClassResult, ClassResultShortName, LegSplit, Organisation, OrganisationId, OrganisationMap,
    PersonId, PersonOrganisations, PersonRaceResult, PersonResult, RaceResults, ResultStatus,
    RunnerSplits,
};

#[derive(Debug, Clone, Default)]
pub struct ImportedResults {
    pub races: Vec<RaceResults>,
    pub person_to_organisation: PersonOrganisations,
    pub person_names: HashMap<PersonId, String>,
}

#[derive(serde::Deserialize)]
struct ResultRow {
    race: u32,
    person_id: Uuid,
    person_name: String,
    organisation_id: Option<Uuid>,
    class: String,
    start_time: Option<NaiveDateTime>,
    finish_time: Option<NaiveDateTime>,
    runtime: Option<u64>,
    position: Option<u32>,
    status: ResultStatus,
}

#[derive(serde::Deserialize)]
struct OrganisationRow {
    id: Uuid,
    short_name: String,
    name: String,
    parent_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct SplitRow {
    person_id: Uuid,
    class: String,
    leg: u32,
    from_control: String,
    to_control: String,
    seconds: f64,
}

pub fn read_results(path: &Path) -> anyhow::Result<ImportedResults> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open results {}", path.display()))?;
    results_from_reader(file).with_context(|| format!("failed to import {}", path.display()))
}

pub fn results_from_reader<R: Read>(reader: R) -> anyhow::Result<ImportedResults> {
    let mut reader = csv::Reader::from_reader(reader);
    // race -> class -> person -> results
    let mut races: BTreeMap<u32, BTreeMap<String, BTreeMap<PersonId, Vec<PersonRaceResult>>>> =
        BTreeMap::new();
    let mut imported = ImportedResults::default();

    for (index, row) in reader.deserialize::<ResultRow>().enumerate() {
        let row = row.with_context(|| format!("invalid result row {}", index + 1))?;
        let person_id = PersonId(row.person_id);

        if let Some(organisation_id) = row.organisation_id {
            imported
                .person_to_organisation
                .insert(person_id, OrganisationId(organisation_id));
        }
        imported.person_names.insert(person_id, row.person_name);

        races
            .entry(row.race)
            .or_default()
            .entry(row.class.clone())
            .or_default()
            .entry(person_id)
            .or_default()
            .push(PersonRaceResult {
                person_id,
                race_number: row.race,
                class_short_name: ClassResultShortName(row.class),
                start_time: row.start_time,
                finish_time: row.finish_time,
                runtime: row.runtime,
                position: row.position,
                status: row.status,
            });
    }

    imported.races = races
        .into_iter()
        .map(|(race_number, classes)| RaceResults {
            race_number,
            class_results: classes
                .into_iter()
                .map(|(class, people)| ClassResult {
                    short_name: ClassResultShortName(class.clone()),
                    name: class.clone(),
                    person_results: people
                        .into_iter()
                        .map(|(person_id, race_results)| PersonResult {
                            person_id,
                            class_short_name: ClassResultShortName(class.clone()),
                            race_results,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    info!(
        event = "results.imported",
        races = imported.races.len(),
        people = imported.person_names.len(),
    );
    Ok(imported)
}

pub fn read_organisations(path: &Path) -> anyhow::Result<OrganisationMap> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open organisations {}", path.display()))?;
    organisations_from_reader(file)
        .with_context(|| format!("failed to import {}", path.display()))
}

pub fn organisations_from_reader<R: Read>(reader: R) -> anyhow::Result<OrganisationMap> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut organisations = OrganisationMap::new();
    let mut parents = Vec::new();

    for (index, row) in reader.deserialize::<OrganisationRow>().enumerate() {
        let row = row.with_context(|| format!("invalid organisation row {}", index + 1))?;
        let id = OrganisationId(row.id);
        if let Some(parent) = row.parent_id {
            parents.push((id, OrganisationId(parent)));
        }
        organisations.insert(
            id,
            Organisation {
                id,
                short_name: row.short_name,
                name: row.name,
                children: Vec::new(),
            },
        );
    }

    for (child, parent) in parents {
        match organisations.get_mut(&parent) {
            Some(parent) => parent.children.push(child),
            None => warn!(%child, %parent, "parent organisation not found"),
        }
    }

    info!(event = "organisations.imported", organisations = organisations.len());
    Ok(organisations)
}

pub fn read_splits(path: &Path) -> anyhow::Result<Vec<RunnerSplits>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open splits {}", path.display()))?;
    splits_from_reader(file).with_context(|| format!("failed to import {}", path.display()))
}

/// Runners keep the order of their first row; legs are sorted by number.
pub fn splits_from_reader<R: Read>(reader: R) -> anyhow::Result<Vec<RunnerSplits>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut runners: Vec<RunnerSplits> = Vec::new();
    let mut positions: HashMap<(PersonId, String), usize> = HashMap::new();

    for (index, row) in reader.deserialize::<SplitRow>().enumerate() {
        let row = row.with_context(|| format!("invalid split row {}", index + 1))?;
        let person_id = PersonId(row.person_id);
        let position = *positions
            .entry((person_id, row.class.clone()))
            .or_insert_with(|| {
                runners.push(RunnerSplits {
                    person_id,
                    class_name: row.class.clone(),
                    legs: Vec::new(),
                });
                runners.len() - 1
            });
        runners[position].legs.push(LegSplit {
            leg_number: row.leg,
            from_control: row.from_control,
            to_control: row.to_control,
            seconds: row.seconds,
        });
    }

    for runner in &mut runners {
        runner.legs.sort_by_key(|leg| leg.leg_number);
    }
    info!(event = "splits.imported", runners = runners.len());
    Ok(runners)
}
