use std::collections::HashMap;
use std::fmt::Write;

use crate::analysis::RunnerAnalysis;
use crate::anomaly::AnomalyClassification;
use crate::models::{Cup, CupStanding, PersonId};
use crate::resilience::ResilienceClassification;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub classification: AnomalyClassification,
    pub count: usize,
}

/// Leg counts per classification, most severe first.
pub fn summarize_classifications(analyses: &[RunnerAnalysis]) -> Vec<ClassificationSummary> {
    let mut map: HashMap<AnomalyClassification, usize> = HashMap::new();
    for index in analyses.iter().flat_map(|analysis| analysis.anomalies.iter()) {
        *map.entry(index.classification).or_insert(0) += 1;
    }

    let mut summaries: Vec<ClassificationSummary> = map
        .into_iter()
        .map(|(classification, count)| ClassificationSummary {
            classification,
            count,
        })
        .collect();
    summaries.sort_by(|a, b| b.classification.cmp(&a.classification));
    summaries
}

pub fn summarize_resilience(
    analyses: &[RunnerAnalysis],
) -> Vec<(ResilienceClassification, usize)> {
    [
        ResilienceClassification::Panic,
        ResilienceClassification::IceMan,
        ResilienceClassification::Resigner,
    ]
    .into_iter()
    .map(|classification| {
        let count = analyses
            .iter()
            .flat_map(|analysis| analysis.resilience.iter())
            .filter(|reaction| reaction.classification == classification)
            .count();
        (classification, count)
    })
    .collect()
}

fn display_name(names: &HashMap<PersonId, String>, person_id: PersonId) -> String {
    names
        .get(&person_id)
        .cloned()
        .unwrap_or_else(|| person_id.to_string())
}

pub fn build_report(
    cup: &Cup,
    standings: &[CupStanding],
    analyses: &[RunnerAnalysis],
    names: &HashMap<PersonId, String>,
    limit: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {} {}", cup.name, cup.year);
    let _ = writeln!(output, "Cup type {}", cup.cup_type);
    if let Some(best_of) = cup.best_of_races {
        let _ = writeln!(output, "Best {} races count", best_of);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Standings");

    if standings.is_empty() {
        let _ = writeln!(output, "No cup points awarded.");
    } else {
        let mut current_class = None;
        let mut shown = 0;
        for standing in standings {
            if current_class != Some(&standing.class_result_short_name) {
                current_class = Some(&standing.class_result_short_name);
                shown = 0;
                let _ = writeln!(output);
                let _ = writeln!(output, "### {}", standing.class_result_short_name);
            }
            if shown >= limit {
                continue;
            }
            shown += 1;
            let _ = writeln!(
                output,
                "{}. {} {} points from {} races",
                shown,
                display_name(names, standing.person_id),
                standing.total_points,
                standing.counted_races
            );
        }
    }

    if analyses.is_empty() {
        return output;
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Leg Classifications");
    for summary in summarize_classifications(analyses) {
        let _ = writeln!(output, "- {}: {} legs", summary.classification, summary.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Suspicious Legs");
    let mut flagged = 0;
    for analysis in analyses {
        for index in analysis.suspicious() {
            flagged += 1;
            let _ = writeln!(
                output,
                "- {} ({}) leg {} {}: {} (AI {:.2}, reference {:.0}s)",
                display_name(names, analysis.person_id),
                analysis.class_name,
                index.leg_number,
                index.segment_key,
                index.classification,
                index.ai_value.unwrap_or_default(),
                index.reference_time
            );
        }
    }
    if flagged == 0 {
        let _ = writeln!(output, "No suspicious legs.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Reactions After Mistakes");
    for (classification, count) in summarize_resilience(analyses) {
        let _ = writeln!(output, "- {}: {}", classification, count);
    }

    output
}
