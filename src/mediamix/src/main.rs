//! mediamix: media-mix performance, synergy and budget reallocation from
//! weekly investment and contribution tables.
//!
//! Loads both tables from JSON files (arrays of row objects), runs one query
//! and prints the result as JSON on stdout.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mediamix_core::config::AppConfig;
use mediamix_reporting::{MixEngine, RecordRepository, RecordSet};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mediamix")]
#[command(about = "Channel performance, synergy and budget reallocation for media-mix data")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "MEDIAMIX_CONFIG")]
    config: Option<String>,

    /// Investment table (overrides config)
    #[arg(long, env = "MEDIAMIX__DATA__INVESTMENTS_PATH")]
    investments: Option<String>,

    /// Contribution table (overrides config)
    #[arg(long, env = "MEDIAMIX__DATA__CONTRIBUTIONS_PATH")]
    contributions: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the calendar years present in the investment table
    Years,
    /// Channel metrics for a year or an explicit date range
    Aggregate {
        #[arg(long, conflicts_with_all = ["start", "end"])]
        year: Option<i32>,
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// Pairwise synergy matrix for a year
    Correlate {
        #[arg(long)]
        year: i32,
    },
    /// Power-law response curves and optimal zones for a year
    Curves {
        #[arg(long)]
        year: i32,
    },
    /// Reallocate a total budget across channels seeded from a year
    Optimize {
        #[arg(long)]
        year: i32,
        /// Defaults to the year's total channel investment
        #[arg(long)]
        total_budget: Option<f64>,
    },
    /// Numeric performance digest for a year
    Summary {
        #[arg(long)]
        year: i32,
    },
    /// Channel deltas between two years
    Compare {
        #[arg(long)]
        from: i32,
        #[arg(long)]
        to: i32,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediamix=info,mediamix_reporting=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(path) = cli.investments {
        config.data.investments_path = path;
    }
    if let Some(path) = cli.contributions {
        config.data.contributions_path = path;
    }

    info!(
        investments = %config.data.investments_path,
        contributions = %config.data.contributions_path,
        "Configuration loaded"
    );

    let repository = Arc::new(RecordRepository::new());
    repository.load(RecordSet::from_rows(
        &read_rows(&config.data.investments_path)?,
        &read_rows(&config.data.contributions_path)?,
    )?);

    let engine = MixEngine::new(repository, &config)?;

    match cli.command {
        Command::Years => emit(&engine.available_years()?),
        Command::Aggregate { year, start, end } => match (year, start, end) {
            (Some(year), _, _) => emit(&engine.aggregate_by_year(year)?),
            (None, Some(start), Some(end)) => emit(&engine.aggregate_by_range(start, end)?),
            _ => anyhow::bail!("pass --year or both --start and --end"),
        },
        Command::Correlate { year } => emit(&engine.correlate(year)?),
        Command::Curves { year } => emit(&engine.response_curves(year)?),
        Command::Optimize { year, total_budget } => {
            let baseline = engine.allocation_baseline(year)?;
            let total = total_budget
                .unwrap_or_else(|| baseline.iter().map(|a| a.current_budget).sum());
            emit(&engine.optimize(&baseline, total)?)
        }
        Command::Summary { year } => emit(&engine.summary(year)?),
        Command::Compare { from, to } => emit(&engine.compare_years(from, to)?),
    }
}

fn read_rows(path: &str) -> anyhow::Result<Vec<serde_json::Map<String, serde_json::Value>>> {
    let raw = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("{path} is not a JSON array of rows"))
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
