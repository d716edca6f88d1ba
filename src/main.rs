use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use lintforge::aggregation::{normalize::normalize_all, ResultAggregator};
use lintforge::app::{handle_fatal_error, init_logging, AppConfig};
use lintforge::degradation::{DegradationManager, HealthMetrics, ManualClock};
use lintforge::plugin::ToolResult;

/// Aggregate analysis tool results and simulate degradation policy
#[derive(Parser)]
#[command(name = "lintforge")]
#[command(about = "Combine analysis tool output into one quality signal", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file (YAML or TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a JSON array of tool results and print the analysis
    Aggregate {
        /// File containing the tool results
        results: PathBuf,

        /// Tool results of an earlier run to compare against
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Project identifier recorded in the analysis
        #[arg(long, default_value = "default")]
        project: String,
    },
    /// Feed a JSON array of health samples through the degradation manager
    Replay {
        /// File containing the health samples
        samples: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app_config = match AppConfig::new(cli.verbose) {
        Ok(config) => config.with_config_path(cli.config.clone()),
        Err(e) => handle_fatal_error(e, cli.verbose),
    };
    init_logging(&app_config);

    let result = match cli.command {
        Commands::Aggregate {
            results,
            baseline,
            project,
        } => run_aggregate(&app_config, &results, baseline.as_deref(), &project),
        Commands::Replay { samples } => run_replay(&app_config, &samples),
    };

    if let Err(e) = result {
        handle_fatal_error(e, cli.verbose);
    }
}

fn read_json<T: DeserializeOwned>(config: &AppConfig, path: &Path) -> Result<T> {
    let path = config.resolve(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn run_aggregate(
    config: &AppConfig,
    results: &Path,
    baseline: Option<&Path>,
    project: &str,
) -> Result<()> {
    let orchestrator = config.orchestrator_config()?;
    let current = normalize_all(read_json::<Vec<ToolResult>>(config, results)?);
    let baseline = baseline
        .map(|path| read_json::<Vec<ToolResult>>(config, path).map(normalize_all))
        .transpose()?;
    debug!("Loaded {} tool results", current.len());

    let aggregator = ResultAggregator::new(orchestrator.scoring);
    let analysis = aggregator.create_analysis_result(current, project, baseline.as_deref());

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn run_replay(config: &AppConfig, samples: &Path) -> Result<()> {
    let orchestrator = config.orchestrator_config()?;
    let samples: Vec<HealthMetrics> = read_json(config, samples)?;

    let Some(first) = samples.first() else {
        anyhow::bail!("No health samples to replay");
    };

    // Sample timestamps drive the clock so cooldowns follow the recording
    let clock = Arc::new(ManualClock::new(first.timestamp));
    let manager = DegradationManager::builder(orchestrator.degradation)
        .clock(clock.clone())
        .build();
    let mut events = manager.subscribe();

    for sample in samples {
        clock.set(sample.timestamp);
        manager.update_health_metrics(sample);
        manager.attempt_recovery();

        while let Ok(event) = events.try_recv() {
            println!("{}\t{}", event.name(), serde_json::to_string(&event)?);
        }
    }

    let statistics = manager.statistics();
    info!(
        "Replay finished at level {} with health score {:.1}",
        statistics.current_level, statistics.health_score
    );
    println!("{}", serde_json::to_string_pretty(&statistics)?);
    Ok(())
}
