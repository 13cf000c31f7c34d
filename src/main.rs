use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::Level;

use orienteering_cup_engine::import::{self, ImportedResults};
use orienteering_cup_engine::telemetry::init_tracing;
use orienteering_cup_engine::{
    calculate_cup, report, strategy_for, Cup, CupStanding, CupType, EngineConfig,
    OrganisationMap, PersonId, RunnerAnalysis, SegmentScope, SplitAnalyzer,
};

#[derive(Parser)]
#[command(name = "cup-engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Orienteering cup standings and split anomaly checks", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// JSON file overriding the built-in rule tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CupArgs {
    #[arg(long, value_enum)]
    cup_type: CupType,
    /// Results CSV covering every race of the cup
    #[arg(long)]
    results: PathBuf,
    /// Organisation tree CSV, required by Kristall and NOR
    #[arg(long)]
    organisations: Option<PathBuf>,
    #[arg(long, default_value = "Cup")]
    name: String,
    #[arg(long, default_value_t = 2026)]
    year: i32,
    /// Count only the best N races instead of the cup type's rule
    #[arg(long)]
    best_of: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate cup standings
    Standings {
        #[command(flatten)]
        cup: CupArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Classify split times of one race
    Anomalies {
        #[arg(long)]
        splits: PathBuf,
        #[arg(long, value_enum, default_value_t = SegmentScope::PerClass)]
        scope: SegmentScope,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        cup: CupArgs,
        #[arg(long)]
        splits: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = SegmentScope::PerClass)]
        scope: SegmentScope,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let config = EngineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Standings { cup, limit } => {
            let (imported, standings) = run_cup(&cup, &config)?;
            if standings.is_empty() {
                println!("No cup points awarded.");
                return Ok(());
            }
            print_standings(&standings, &imported.person_names, limit);
        }
        Commands::Anomalies { splits, scope } => {
            let analyses = run_analysis(&splits, &config, scope)?;
            let mut flagged = 0;
            for analysis in &analyses {
                for index in analysis.suspicious() {
                    flagged += 1;
                    println!(
                        "- {} leg {} {}: {} (AI {:.2})",
                        analysis.person_id,
                        index.leg_number,
                        index.segment_key,
                        index.classification,
                        index.ai_value.unwrap_or_default()
                    );
                }
            }
            if flagged == 0 {
                println!("No suspicious legs across {} runners.", analyses.len());
            }
        }
        Commands::Report {
            cup,
            splits,
            scope,
            limit,
            out,
        } => {
            let (imported, standings) = run_cup(&cup, &config)?;
            let analyses = match splits {
                Some(path) => run_analysis(&path, &config, scope)?,
                None => Vec::new(),
            };
            let report = report::build_report(
                &cup_from_args(&cup),
                &standings,
                &analyses,
                &imported.person_names,
                limit,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn cup_from_args(args: &CupArgs) -> Cup {
    Cup {
        name: args.name.clone(),
        year: args.year,
        cup_type: args.cup_type,
        best_of_races: args.best_of,
    }
}

fn run_cup(
    args: &CupArgs,
    config: &EngineConfig,
) -> anyhow::Result<(ImportedResults, Vec<CupStanding>)> {
    let imported = import::read_results(&args.results)?;
    let organisations: Option<Arc<OrganisationMap>> = args
        .organisations
        .as_deref()
        .map(import::read_organisations)
        .transpose()?
        .map(Arc::new);

    let strategy = strategy_for(args.cup_type, config, organisations);
    let standings = calculate_cup(
        strategy.as_ref(),
        &cup_from_args(args),
        &imported.races,
        &imported.person_to_organisation,
    )
    .with_context(|| format!("failed to calculate {} cup", args.cup_type))?;

    Ok((imported, standings))
}

fn run_analysis(
    path: &Path,
    config: &EngineConfig,
    scope: SegmentScope,
) -> anyhow::Result<Vec<RunnerAnalysis>> {
    let runners = import::read_splits(path)?;
    Ok(SplitAnalyzer::from_config(config, scope).analyze(&runners))
}

fn print_standings(standings: &[CupStanding], names: &HashMap<PersonId, String>, limit: usize) {
    let mut current_class = None;
    let mut shown = 0;
    for standing in standings {
        if current_class != Some(&standing.class_result_short_name) {
            current_class = Some(&standing.class_result_short_name);
            shown = 0;
            println!("{}:", standing.class_result_short_name);
        }
        if shown >= limit {
            continue;
        }
        shown += 1;
        let name = names
            .get(&standing.person_id)
            .cloned()
            .unwrap_or_else(|| standing.person_id.to_string());
        println!(
            "  {:>2}. {} {} points ({} races)",
            shown, name, standing.total_points, standing.counted_races
        );
    }
}
