//! Match execution - play one descriptor and score the evaluated seat
//!
//! Level 3 - Step-level implementation

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use catanbench_core::{EngineError, GameEngine, Standings, TraceError, DEFAULT_MAX_ROUNDS, SEATS};
use serde::Serialize;
use thiserror::Error;

use crate::descriptor::MatchDescriptor;
use crate::pool::panic_message;

/// Scored result of one match from the evaluated agent's seat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    /// 1 if the evaluated seat is the recorded leader
    pub victory: u8,
    /// Final victory points of the evaluated seat
    pub points: u32,
    /// 1-based placement (1 = best)
    pub rank: u8,
    /// Tied for the most points but another seat got the win
    pub shared_lead: bool,
}

impl MatchOutcome {
    /// Recorded for any match that failed to produce a result
    pub const FALLBACK: MatchOutcome = MatchOutcome {
        victory: 0,
        points: 0,
        rank: SEATS as u8,
        shared_lead: false,
    };
}

/// Why a match could not be scored
#[derive(Debug, Error)]
pub enum MatchFault {
    #[error("engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("unreadable trace: {0}")]
    Trace(#[from] TraceError),

    #[error("seat {seat} reported negative points ({points})")]
    NegativePoints { seat: String, points: i64 },

    #[error("match panicked: {0}")]
    Panic(String),
}

/// Plays descriptors against an engine. Never fails: faults become the fallback outcome.
pub struct MatchRunner {
    engine: Arc<dyn GameEngine>,
    max_rounds: u32,
    store_trace: bool,
}

impl MatchRunner {
    pub fn new(engine: Arc<dyn GameEngine>) -> Self {
        Self {
            engine,
            max_rounds: DEFAULT_MAX_ROUNDS,
            store_trace: false,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_store_trace(mut self, store_trace: bool) -> Self {
        self.store_trace = store_trace;
        self
    }

    /// Play one match and score it, falling back to (0, 0, 4) on any fault
    pub fn run(&self, descriptor: &MatchDescriptor) -> MatchOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.try_run(descriptor)))
            .unwrap_or_else(|payload| Err(MatchFault::Panic(panic_message(payload.as_ref()))));

        match result {
            Ok(outcome) => outcome,
            Err(fault) => {
                report_fault(descriptor, &fault);
                MatchOutcome::FALLBACK
            }
        }
    }

    /// Play one match and score it, surfacing faults
    pub fn try_run(&self, descriptor: &MatchDescriptor) -> Result<MatchOutcome, MatchFault> {
        let lineup = descriptor.lineup();
        let trace = self
            .engine
            .run_match(&lineup, self.max_rounds, self.store_trace)?;
        let standings = trace.final_standings()?;
        score_seat(&standings, &descriptor.seat())
    }
}

/// Victory, points and rank for one seat of the final standings
pub fn score_seat(standings: &Standings, seat: &str) -> Result<MatchOutcome, MatchFault> {
    let raw = standings.points_of(seat)?;
    let points = u32::try_from(raw).map_err(|_| MatchFault::NegativePoints {
        seat: seat.to_string(),
        points: raw,
    })?;

    // points_of succeeded, so the seat is ranked
    let rank = standings.rank_of(seat).unwrap_or(SEATS).min(SEATS);

    Ok(MatchOutcome {
        victory: u8::from(standings.leader() == Some(seat)),
        points,
        rank: rank as u8,
        shared_lead: standings.shares_lead_without_credit(seat),
    })
}

fn report_fault(descriptor: &MatchDescriptor, fault: &MatchFault) {
    tracing::error!(
        key = %descriptor.evaluated.key,
        position = descriptor.position,
        repetition = descriptor.repetition,
        opponents = ?descriptor.opponent_names(),
        "match failed, recording fallback outcome: {}",
        error_chain(fault)
    );
}

/// Render an error with all of its sources
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EvaluatedAgent, HarnessConfig};
    use crate::descriptor::MatchPlan;
    use catanbench_core::{AgentFactory, GameTrace, RemoteCatalog};

    fn standings(points: &[i64]) -> Standings {
        Standings::new(
            points
                .iter()
                .enumerate()
                .map(|(i, vp)| (format!("J{}", i), *vp))
                .collect(),
        )
    }

    /// Engine returning the same final points every match
    struct FixedEngine {
        points: Vec<i64>,
    }

    impl GameEngine for FixedEngine {
        fn run_match(
            &self,
            seats: &[Arc<dyn AgentFactory>],
            _max_rounds: u32,
            _store_trace: bool,
        ) -> Result<GameTrace, EngineError> {
            assert_eq!(seats.len(), SEATS);
            let mut trace = GameTrace::new();
            trace.record_victory_points(
                3,
                1,
                self.points
                    .iter()
                    .enumerate()
                    .map(|(i, vp)| (format!("J{}", i), *vp)),
            );
            Ok(trace)
        }
    }

    struct FailingEngine;

    impl GameEngine for FailingEngine {
        fn run_match(
            &self,
            _seats: &[Arc<dyn AgentFactory>],
            _max_rounds: u32,
            _store_trace: bool,
        ) -> Result<GameTrace, EngineError> {
            Err(EngineError::Simulation("illegal move".to_string()))
        }
    }

    struct PanickingEngine;

    impl GameEngine for PanickingEngine {
        fn run_match(
            &self,
            _seats: &[Arc<dyn AgentFactory>],
            _max_rounds: u32,
            _store_trace: bool,
        ) -> Result<GameTrace, EngineError> {
            panic!("agent blew up");
        }
    }

    fn first_descriptor_at(position: usize) -> MatchDescriptor {
        let config = HarnessConfig::permutations(
            vec!["R0".to_string(), "R1".to_string(), "R2".to_string()],
            vec![EvaluatedAgent::new("A")],
        )
        .with_repetitions(1);
        let plan = MatchPlan::build(&config, &RemoteCatalog).unwrap();
        let found = plan.descriptors().find(|d| d.position == position);
        found.unwrap()
    }

    #[test]
    fn test_score_winner() {
        let outcome = score_seat(&standings(&[3, 10, 2, 1]), "J1").unwrap();
        assert_eq!(outcome.victory, 1);
        assert_eq!(outcome.points, 10);
        assert_eq!(outcome.rank, 1);
        assert!(!outcome.shared_lead);
    }

    #[test]
    fn test_score_tie_goes_to_first_listed() {
        let table = standings(&[10, 10, 5, 0]);

        let first = score_seat(&table, "J0").unwrap();
        assert_eq!((first.victory, first.rank), (1, 1));

        let second = score_seat(&table, "J1").unwrap();
        assert_eq!((second.victory, second.points, second.rank), (0, 10, 2));
        assert!(second.shared_lead);
    }

    #[test]
    fn test_score_last_place() {
        let outcome = score_seat(&standings(&[10, 10, 5, 0]), "J3").unwrap();
        assert_eq!((outcome.victory, outcome.points, outcome.rank), (0, 0, 4));
    }

    #[test]
    fn test_score_missing_seat() {
        let table = Standings::new(vec![("J0".to_string(), 3)]);
        assert!(matches!(
            score_seat(&table, "J2"),
            Err(MatchFault::Trace(TraceError::MissingSeat { .. }))
        ));
    }

    #[test]
    fn test_score_negative_points() {
        assert!(matches!(
            score_seat(&standings(&[-1, 0, 0, 0]), "J0"),
            Err(MatchFault::NegativePoints { .. })
        ));
    }

    #[test]
    fn test_run_scores_evaluated_seat() {
        let runner = MatchRunner::new(Arc::new(FixedEngine {
            points: vec![3, 10, 2, 1],
        }));

        let at_one = runner.run(&first_descriptor_at(1));
        assert_eq!((at_one.victory, at_one.points, at_one.rank), (1, 10, 1));

        let at_three = runner.run(&first_descriptor_at(3));
        assert_eq!((at_three.victory, at_three.points, at_three.rank), (0, 1, 4));
    }

    #[test]
    fn test_engine_error_gives_fallback() {
        let runner = MatchRunner::new(Arc::new(FailingEngine));
        let descriptor = first_descriptor_at(0);
        assert!(matches!(runner.try_run(&descriptor), Err(MatchFault::Engine(_))));
        assert_eq!(runner.run(&descriptor), MatchOutcome::FALLBACK);
    }

    #[test]
    fn test_panic_gives_fallback() {
        let runner = MatchRunner::new(Arc::new(PanickingEngine));
        assert_eq!(runner.run(&first_descriptor_at(2)), MatchOutcome::FALLBACK);
    }

    #[test]
    fn test_fallback_values() {
        assert_eq!(MatchOutcome::FALLBACK.victory, 0);
        assert_eq!(MatchOutcome::FALLBACK.points, 0);
        assert_eq!(MatchOutcome::FALLBACK.rank, 4);
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let fault = MatchFault::Engine(EngineError::Spawn {
            command: "engine".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
        let rendered = error_chain(&fault);
        assert!(rendered.starts_with("engine failed"));
        assert!(rendered.ends_with("no such file"));
    }
}
