//! Result aggregation and progress milestones
//!
//! Level 3 - Step-level implementation

use catanbench_core::SEATS;
use serde::Serialize;

use crate::runner::MatchOutcome;

/// Running totals for one evaluated entry
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AggregateCounters {
    pub wins: u64,
    pub points_sum: u64,
    pub rank_sum: u64,
    pub matches_completed: u64,
    /// Wins broken down by the seat the evaluated agent held
    pub wins_by_position: [u64; SEATS],
    /// Matches tied for the lead without the win
    pub shared_lead: u64,
}

impl AggregateCounters {
    /// Fold one outcome in
    pub fn record(&mut self, position: usize, outcome: &MatchOutcome) {
        self.wins += u64::from(outcome.victory);
        self.points_sum += u64::from(outcome.points);
        self.rank_sum += u64::from(outcome.rank);
        self.matches_completed += 1;
        if let Some(slot) = self.wins_by_position.get_mut(position) {
            *slot += u64::from(outcome.victory);
        }
        if outcome.shared_lead {
            self.shared_lead += 1;
        }
    }
}

/// Point at which progress is reported
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Milestone {
    pub completed: u64,
    pub total: u64,
}

impl Milestone {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Receives progress while a run is underway
pub trait ProgressObserver {
    /// Called once before the first match is dispatched
    fn started(&mut self, _total: u64) {}

    /// Called after every completed match
    fn advanced(&mut self, _completed: u64, _total: u64) {}

    /// Called every `progress_interval` completions and at the final one
    fn milestone(&mut self, milestone: Milestone);

    /// Called once all matches are in
    fn finished(&mut self) {}
}

/// Observer that reports milestones through tracing
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn milestone(&mut self, milestone: Milestone) {
        tracing::info!(
            "Progress: {}/{} matches completed ({:.2}%)",
            milestone.completed,
            milestone.total,
            milestone.percent()
        );
    }
}

/// Folds outcomes into per-entry counters, in whatever order they arrive
#[derive(Debug)]
pub struct ResultAggregator {
    counters: Vec<AggregateCounters>,
    total: u64,
    completed: u64,
    interval: u64,
}

impl ResultAggregator {
    pub fn new(entries: usize, total: u64, interval: u64) -> Self {
        Self {
            counters: vec![AggregateCounters::default(); entries],
            total,
            completed: 0,
            interval: interval.max(1),
        }
    }

    /// Record one outcome for `entry`; returns a milestone when one is reached
    pub fn record(&mut self, entry: usize, position: usize, outcome: &MatchOutcome) -> Option<Milestone> {
        let Some(counters) = self.counters.get_mut(entry) else {
            tracing::warn!(entry, "outcome for unknown entry dropped");
            return None;
        };
        counters.record(position, outcome);
        self.completed += 1;

        if self.completed % self.interval == 0 || self.completed == self.total {
            Some(Milestone {
                completed: self.completed,
                total: self.total,
            })
        } else {
            None
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn counters(&self) -> &[AggregateCounters] {
        &self.counters
    }

    pub fn into_counters(self) -> Vec<AggregateCounters> {
        self.counters
    }
}
