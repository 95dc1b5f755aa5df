//! Run command - execute a full benchmark
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: execute(), save_results(), report_results()
//! - Level 4: command arguments

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use catanbench_harness::{run_benchmark, BenchmarkSummary, HarnessConfig, LogProgress};

use crate::progress::BarProgress;
use crate::setup::{build_catalog, build_engine, load_config};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct RunArgs {
    /// Benchmark configuration (JSON)
    #[arg(long)]
    pub config: PathBuf,

    /// Where to write the CSV results
    #[arg(long, default_value = "benchmark_vs_estandar_resultados.csv")]
    pub output: PathBuf,

    /// Print the summary as JSON instead of the text report
    #[arg(long)]
    pub json: bool,

    /// Override repetitions per (trio, position)
    #[arg(long)]
    pub repetitions: Option<u32>,

    /// Override the share of CPUs used for workers
    #[arg(long)]
    pub worker_fraction: Option<f64>,

    /// Show a progress bar instead of periodic progress lines
    #[arg(long)]
    pub progress_bar: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run the benchmark command
///
/// 1. Load and validate the configuration
/// 2. Resolve agents with the engine and run every planned match
/// 3. Write the CSV artifact
/// 4. Print the report
pub fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.config, args.repetitions, args.worker_fraction)?;
    let summary = execute(&config, args.progress_bar)?;
    save_results(&summary, &args.output)?;
    report_results(&summary, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn execute(config: &HarnessConfig, progress_bar: bool) -> Result<BenchmarkSummary> {
    let engine = build_engine(config)?;
    let catalog = build_catalog(&engine, config)?;
    let engine = Arc::new(engine);

    let summary = if progress_bar {
        run_benchmark(config, &catalog, engine, &mut BarProgress::new())
    } else {
        run_benchmark(config, &catalog, engine, &mut LogProgress)
    };

    summary.context("Benchmark run failed")
}

fn save_results(summary: &BenchmarkSummary, output: &Path) -> Result<()> {
    summary
        .write_csv(output)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;
    tracing::info!("Results saved to {}", output.display());
    Ok(())
}

fn report_results(summary: &BenchmarkSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", summary.to_json().context("Failed to render JSON summary")?);
    } else {
        print!("{}", summary.render());
    }

    if !summary.is_complete() {
        tracing::warn!(
            "{} entries did not complete every planned match",
            summary.violations.len()
        );
    }
    Ok(())
}
