//! Benchmark execution - plan, dispatch, aggregate, summarize
//!
//! Level 1 - Orchestration and Level 2 - Phases

use std::sync::Arc;
use std::time::Instant;

use catanbench_core::{AgentCatalog, GameEngine};
use chrono::Utc;

use crate::aggregate::{ProgressObserver, ResultAggregator};
use crate::config::HarnessConfig;
use crate::descriptor::{MatchDescriptor, MatchPlan};
use crate::error::Result;
use crate::pool::{available_workers, worker_count, ExecutionPool};
use crate::runner::MatchRunner;
use crate::summary::{summarize, BenchmarkSummary};

// ============================================================================
// Level 1 - Orchestration
// ============================================================================

/// Run a full benchmark (Level 1 orchestration)
///
/// # Arguments
/// * `config` - Benchmark configuration
/// * `catalog` - Resolves class paths into agent factories
/// * `engine` - Plays individual matches
/// * `observer` - Receives progress while matches complete
///
/// # Returns
/// Summary records sorted by win ratio. Configuration problems fail before
/// any worker is started; match failures never fail the run.
pub fn run_benchmark(
    config: &HarnessConfig,
    catalog: &dyn AgentCatalog,
    engine: Arc<dyn GameEngine>,
    observer: &mut dyn ProgressObserver,
) -> Result<BenchmarkSummary> {
    let plan = MatchPlan::build(config, catalog)?;
    let workers = worker_count(available_workers(), config.worker_fraction);
    announce_plan(&plan, config, workers);

    let runner = MatchRunner::new(engine)
        .with_max_rounds(config.max_rounds)
        .with_store_trace(config.store_trace);
    let pool = ExecutionPool::new(workers, config.batch_capacity)?;

    let start = Instant::now();
    let aggregator = execute_plan(&plan, runner, &pool, config.progress_interval, observer)?;
    let elapsed = start.elapsed();

    let (records, violations) = summarize(&plan.keys(), aggregator.counters(), plan.matches_per_entry());
    for v in &violations {
        tracing::warn!(
            key = %v.key,
            expected = v.expected,
            completed = v.completed,
            "entry did not complete every planned match"
        );
    }

    Ok(BenchmarkSummary {
        records,
        violations,
        total_matches: plan.total_matches(),
        matches_per_entry: plan.matches_per_entry(),
        workers,
        elapsed_secs: elapsed.as_secs_f64(),
        finished_at: Utc::now(),
    })
}

// ============================================================================
// Level 2 - Phases
// ============================================================================

/// Log the worker count and the up-front estimate (Level 2 phase)
pub fn announce_plan(plan: &MatchPlan, config: &HarnessConfig, workers: usize) {
    tracing::info!(
        "Workers: {} ({:.0}% of {} available)",
        workers,
        config.worker_fraction * 100.0,
        available_workers()
    );
    tracing::info!(
        "Total matches to simulate: {}. Estimated time: {:.2} minutes",
        plan.total_matches(),
        plan.estimated_minutes(config.estimated_match_secs)
    );
}

/// Stream every descriptor through the pool and fold outcomes (Level 2 phase)
fn execute_plan(
    plan: &MatchPlan,
    runner: MatchRunner,
    pool: &ExecutionPool,
    progress_interval: u64,
    observer: &mut dyn ProgressObserver,
) -> Result<ResultAggregator> {
    let total = plan.total_matches();
    let mut aggregator = ResultAggregator::new(plan.entries().len(), total, progress_interval);
    let runner = Arc::new(runner);

    observer.started(total);
    pool.stream(
        plan.descriptors(),
        move |descriptor: MatchDescriptor| {
            let outcome = runner.run(&descriptor);
            (descriptor.evaluated.index, descriptor.position, outcome)
        },
        |(entry, position, outcome)| {
            let milestone = aggregator.record(entry, position, &outcome);
            observer.advanced(aggregator.completed(), total);
            if let Some(milestone) = milestone {
                observer.milestone(milestone);
            }
        },
    )?;
    observer.finished();

    Ok(aggregator)
}
