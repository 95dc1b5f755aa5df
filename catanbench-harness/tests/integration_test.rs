//! Integration tests for the benchmark harness
//!
//! Tests the full stack: plan building, in-process agents, the worker pool,
//! aggregation and the CSV artifact

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use catanbench_core::{
    build_seats, Agent, AgentError, AgentFactory, AgentParams, AgentRegistry, ConfigurableAgent,
    CoreError, EngineError, GameEngine, GameTrace,
};
use catanbench_harness::{
    run_benchmark, BenchmarkSummary, EvaluatedAgent, HarnessConfig, HarnessError, Milestone,
    ProgressObserver, SummaryRecord,
};
use serde_json::json;

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Agent that always finishes a match on a fixed number of points
struct ScriptedAgent {
    id: String,
    points: i64,
}

impl Agent for ScriptedAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ConfigurableAgent for ScriptedAgent {
    fn construct(agent_id: &str, params: Option<&AgentParams>) -> Result<Self, AgentError> {
        let points = params
            .and_then(|p| p.named("points").or_else(|| p.positional(0)))
            .and_then(|v| v.as_i64())
            .ok_or_else(|| AgentError::construction("Scripted", agent_id, "no points configured"))?;
        Ok(Self {
            id: agent_id.to_string(),
            points,
        })
    }
}

fn reference(agent_id: &str, points: i64) -> Result<Box<dyn Agent>, AgentError> {
    Ok(Box::new(ScriptedAgent {
        id: agent_id.to_string(),
        points,
    }))
}

fn ref_low(agent_id: &str, _: Option<&AgentParams>) -> Result<Box<dyn Agent>, AgentError> {
    reference(agent_id, 2)
}

fn ref_mid(agent_id: &str, _: Option<&AgentParams>) -> Result<Box<dyn Agent>, AgentError> {
    reference(agent_id, 5)
}

fn ref_high(agent_id: &str, _: Option<&AgentParams>) -> Result<Box<dyn Agent>, AgentError> {
    reference(agent_id, 8)
}

fn ref_top(agent_id: &str, _: Option<&AgentParams>) -> Result<Box<dyn Agent>, AgentError> {
    reference(agent_id, 12)
}

fn registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry
        .register::<ScriptedAgent>("Scripted")
        .register_fn("Ref.Low", ref_low)
        .register_fn("Ref.Mid", ref_mid)
        .register_fn("Ref.High", ref_high)
        .register_fn("Ref.Top", ref_top);
    registry
}

fn roster() -> Vec<String> {
    ["Ref.Low", "Ref.Mid", "Ref.High", "Ref.Top"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn scripted(params: serde_json::Value) -> EvaluatedAgent {
    EvaluatedAgent::new("Scripted").with_params(params)
}

/// In-process engine: builds the seated agents and reports their scripted points.
///
/// A negative score makes the match panic. Earlier rounds and turns carry
/// decoy values so only the last turn of the last round counts.
#[derive(Default)]
struct TableEngine {
    calls: AtomicUsize,
}

impl GameEngine for TableEngine {
    fn run_match(
        &self,
        seats: &[Arc<dyn AgentFactory>],
        _max_rounds: u32,
        _store_trace: bool,
    ) -> Result<GameTrace, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut agents = build_seats(seats)?;

        let mut finals = Vec::with_capacity(agents.len());
        for agent in agents.iter_mut() {
            let id = agent.agent_id().to_string();
            let points = agent
                .as_any_mut()
                .downcast_mut::<ScriptedAgent>()
                .map(|a| a.points)
                .ok_or_else(|| EngineError::Simulation(format!("{} is not scripted", id)))?;
            if points < 0 {
                panic!("agent {} crashed", id);
            }
            finals.push((id, points));
        }

        let mut trace = GameTrace::new();
        let decoy: Vec<(String, i64)> = finals.iter().map(|(id, _)| (id.clone(), 99)).collect();
        trace.record_victory_points(2, 4, decoy.clone());
        trace.record_victory_points(10, 3, decoy);
        trace.record_victory_points(10, 11, finals);
        Ok(trace)
    }
}

#[derive(Default)]
struct Milestones(Vec<Milestone>);

impl ProgressObserver for Milestones {
    fn milestone(&mut self, milestone: Milestone) {
        self.0.push(milestone);
    }
}

fn run(config: &HarnessConfig, engine: Arc<TableEngine>) -> BenchmarkSummary {
    run_benchmark(config, &registry(), engine, &mut Milestones::default()).unwrap()
}

fn record<'a>(summary: &'a BenchmarkSummary, key: &str) -> &'a SummaryRecord {
    summary
        .records
        .iter()
        .find(|r| r.key == key)
        .unwrap_or_else(|| panic!("no record for {}", key))
}

// ============================================================================
// FULL RUN TESTS
// ============================================================================

#[test]
fn test_single_entry_plays_every_descriptor() {
    let engine = Arc::new(TableEngine::default());
    let config = HarnessConfig::permutations(roster(), vec![scripted(json!({"points": 20}))])
        .with_repetitions(1);

    let summary = run(&config, Arc::clone(&engine));

    assert_eq!(summary.total_matches, 96);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 96);
    assert!(summary.is_complete());

    let r = record(&summary, "Scripted{\"points\":20}");
    assert_eq!(r.wins, 96);
    assert_eq!(r.points, 96 * 20);
    assert_eq!(r.ratio, 1.0);
    assert_eq!(r.mean_rank, 1.0);
    assert_eq!(r.wins_by_position, [24, 24, 24, 24]);
}

#[test]
fn test_entries_are_ranked_by_ratio() {
    let config = HarnessConfig::permutations(
        roster(),
        vec![
            scripted(json!({"points": 0})),
            scripted(json!({"points": 20})),
            scripted(json!([12])),
        ],
    )
    .with_repetitions(2);

    let summary = run(&config, Arc::new(TableEngine::default()));

    let keys: Vec<&str> = summary.records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["Scripted{\"points\":20}", "Scripted[12]", "Scripted{\"points\":0}"]
    );

    let last = record(&summary, "Scripted{\"points\":0}");
    assert_eq!(last.wins, 0);
    assert_eq!(last.mean_rank, 4.0);
    assert_eq!(last.total, 192);
}

#[test]
fn test_shared_lead_goes_to_first_listed_seat() {
    // 12 points ties Ref.Top; the earlier seat takes the win
    let config = HarnessConfig::permutations(roster(), vec![scripted(json!({"points": 12}))])
        .with_repetitions(1);

    let summary = run(&config, Arc::new(TableEngine::default()));
    let r = record(&summary, "Scripted{\"points\":12}");

    // 6 trios without Ref.Top win everywhere (24); with Ref.Top at trio
    // index t the evaluated seat wins in t + 1 positions (6 * (1 + 2 + 3))
    assert_eq!(r.wins, 60);
    assert_eq!(r.shared_lead, 36);
    assert_eq!(r.wins_by_position, [24, 18, 12, 6]);
}

#[test]
fn test_fixed_field() {
    let config = HarnessConfig::fixed(
        vec!["Ref.Low".to_string(); 3],
        vec![scripted(json!({"points": 5}))],
    )
    .with_repetitions(25);

    let summary = run(&config, Arc::new(TableEngine::default()));
    let r = record(&summary, "Scripted{\"points\":5}");

    assert_eq!(summary.total_matches, 100);
    assert_eq!(r.wins_by_position, [25, 25, 25, 25]);
    assert_eq!(r.mean_points, 5.0);
}

// ============================================================================
// FAULT CONTAINMENT TESTS
// ============================================================================

#[test]
fn test_crashing_agent_counts_as_fallback() {
    let engine = Arc::new(TableEngine::default());
    let config = HarnessConfig::permutations(
        roster(),
        vec![scripted(json!({"points": -1})), scripted(json!({"points": 20}))],
    )
    .with_repetitions(1);

    let summary = run(&config, Arc::clone(&engine));

    // Every match ran and counted despite the panics
    assert_eq!(engine.calls.load(Ordering::SeqCst), 192);
    assert!(summary.is_complete());

    let crashed = record(&summary, "Scripted{\"points\":-1}");
    assert_eq!((crashed.wins, crashed.points), (0, 0));
    assert_eq!(crashed.mean_rank, 4.0);

    let healthy = record(&summary, "Scripted{\"points\":20}");
    assert_eq!(healthy.wins, 96);
}

#[test]
fn test_construction_failure_counts_as_fallback() {
    let config = HarnessConfig::permutations(roster(), vec![scripted(json!({"depth": 3}))])
        .with_repetitions(1);

    let summary = run(&config, Arc::new(TableEngine::default()));
    let r = record(&summary, "Scripted{\"depth\":3}");

    assert_eq!(r.wins, 0);
    assert_eq!(r.mean_rank, 4.0);
    assert!(summary.is_complete());
}

#[test]
fn test_unknown_class_path_is_configuration_error() {
    let engine = Arc::new(TableEngine::default());
    let config = HarnessConfig::permutations(roster(), vec![EvaluatedAgent::new("Agents.Missing")]);

    let err = run_benchmark(&config, &registry(), engine.clone(), &mut Milestones::default())
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Agent(CoreError::UnknownAgent { ref class_path }) if class_path == "Agents.Missing"
    ));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// REPORTING TESTS
// ============================================================================

#[test]
fn test_progress_and_csv_artifact() {
    let mut milestones = Milestones::default();
    let config = HarnessConfig::permutations(roster(), vec![scripted(json!({"points": 20}))])
        .with_repetitions(1)
        .with_progress_interval(40);

    let summary = run_benchmark(
        &config,
        &registry(),
        Arc::new(TableEngine::default()),
        &mut milestones,
    )
    .unwrap();

    let marks: Vec<u64> = milestones.0.iter().map(|m| m.completed).collect();
    assert_eq!(marks, vec![40, 80, 96]);

    let path = std::env::temp_dir().join(format!("catanbench-it-{}.csv", std::process::id()));
    summary.write_csv(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "\"Scripted{\"\"points\"\":20}\",96,1920,96,1.0000,20.00,1.00"
    );
}

#[cfg(unix)]
#[test]
fn test_process_engine_end_to_end() {
    use catanbench_core::{ProcessEngine, ProcessEngineConfig, RemoteCatalog};

    // Seat J0 always wins
    let engine = ProcessEngine::new(&ProcessEngineConfig {
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"cat >/dev/null; printf '{"game":{"round_1":{"turn_P1":{"end_turn":{"victory_points":{"J0":10,"J1":4,"J2":3,"J3":2}}}}}}'"#.to_string(),
        ],
        timeout_secs: Some(30),
    })
    .unwrap();

    let config = HarnessConfig::permutations(
        vec!["Agents.A".to_string(), "Agents.B".to_string(), "Agents.C".to_string()],
        vec![EvaluatedAgent::new("Agents.Eval")],
    )
    .with_repetitions(1);

    let summary =
        run_benchmark(&config, &RemoteCatalog, Arc::new(engine), &mut Milestones::default()).unwrap();
    let r = &summary.records[0];

    assert_eq!(r.total, 24);
    assert_eq!(r.wins, 6);
    assert_eq!(r.wins_by_position, [6, 0, 0, 0]);
    assert_eq!(r.ratio, 0.25);
}
