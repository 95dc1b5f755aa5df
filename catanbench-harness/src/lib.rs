//! Catanbench Harness - parallel benchmarking of game-playing agents
//!
//! This crate provides the benchmark pipeline:
//! - Match generation over ordered opponent trios and seat positions
//! - Fault-tolerant match execution on a bounded worker pool
//! - Order-independent aggregation with progress milestones
//! - Sorted summaries, CSV artifact and console report
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_benchmark (orchestration)
//! - Level 2: execute_plan, summarize (phases)
//! - Level 3: MatchPlan::descriptors, MatchRunner::run, ResultAggregator::record (steps)
//! - Level 4: worker pool, configuration

mod aggregate;
mod benchmark;
mod config;
mod descriptor;
mod error;
mod pool;
mod runner;
mod summary;

pub use aggregate::{AggregateCounters, LogProgress, Milestone, ProgressObserver, ResultAggregator};
pub use benchmark::{announce_plan, run_benchmark};
pub use config::{EvaluatedAgent, HarnessConfig, OpponentField};
pub use descriptor::{EvaluatedEntry, MatchDescriptor, MatchPlan, Trio, OPPONENTS};
pub use error::{HarnessError, Result};
pub use pool::{available_workers, worker_count, ExecutionPool};
pub use runner::{error_chain, score_seat, MatchFault, MatchOutcome, MatchRunner};
pub use summary::{format_hms, summarize, BenchmarkSummary, InvariantViolation, SummaryRecord, CSV_HEADER};
