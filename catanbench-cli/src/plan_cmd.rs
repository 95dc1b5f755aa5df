//! Plan command - validate a configuration without running matches

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use catanbench_core::SEATS;
use catanbench_harness::{available_workers, worker_count, HarnessConfig, MatchPlan};

use crate::setup::{build_catalog, build_engine, load_config};

#[derive(Args)]
pub struct PlanArgs {
    /// Benchmark configuration (JSON)
    #[arg(long)]
    pub config: PathBuf,

    /// Override repetitions per (trio, position)
    #[arg(long)]
    pub repetitions: Option<u32>,

    /// Override the share of CPUs used for workers
    #[arg(long)]
    pub worker_fraction: Option<f64>,
}

/// Print descriptor counts, workers and the time estimate
pub fn run(args: PlanArgs) -> Result<()> {
    let config = load_config(&args.config, args.repetitions, args.worker_fraction)?;
    let engine = build_engine(&config)?;
    let catalog = build_catalog(&engine, &config)?;
    let plan = MatchPlan::build(&config, &catalog).context("Failed to build match plan")?;
    let workers = worker_count(available_workers(), config.worker_fraction);
    print!("{}", describe(&plan, &config, workers));
    Ok(())
}

fn describe(plan: &MatchPlan, config: &HarnessConfig, workers: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Evaluated entries: {}", plan.entries().len());
    for entry in plan.entries() {
        let _ = writeln!(out, "  - {}", entry.key);
    }
    let _ = writeln!(
        out,
        "Opponent trios: {} x {} positions x {} repetitions",
        plan.trio_count(),
        SEATS,
        plan.repetitions()
    );
    let _ = writeln!(out, "Matches per entry: {}", plan.matches_per_entry());
    let _ = writeln!(out, "Total matches: {}", plan.total_matches());
    let _ = writeln!(out, "Workers: {}", workers);
    let _ = writeln!(
        out,
        "Estimated time: {:.2} minutes",
        plan.estimated_minutes(config.estimated_match_secs)
    );
    out
}
