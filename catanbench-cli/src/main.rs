//! Catanbench CLI - Command-line interface
//!
//! Commands:
//! - run: Benchmark agent configurations against a reference field
//! - plan: Validate a configuration and show what a run would do

mod plan_cmd;
mod progress;
mod run_cmd;
mod setup;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catanbench")]
#[command(about = "Parallel benchmark harness for four-player game agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full benchmark and write the CSV artifact
    Run(run_cmd::RunArgs),
    /// Validate a configuration and print the match plan
    Plan(plan_cmd::PlanArgs),
}

fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_cmd::run(args),
        Commands::Plan(args) => plan_cmd::run(args),
    }
}
