//! Configuration types for benchmark runs
//!
//! Level 4 - Utilities and configuration

use std::path::Path;

use catanbench_core::{AgentParams, AgentSpec, ProcessEngineConfig, DEFAULT_MAX_ROUNDS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarnessError, Result};

/// Opponent trios are drawn from this field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OpponentField {
    /// Every ordered selection of 3 distinct roster members
    Permutations { roster: Vec<String> },
    /// One fixed, ordered trio (e.g. three random agents)
    Fixed { opponents: Vec<String> },
}

impl OpponentField {
    /// Class paths that appear in this field
    pub fn class_paths(&self) -> &[String] {
        match self {
            OpponentField::Permutations { roster } => roster,
            OpponentField::Fixed { opponents } => opponents,
        }
    }
}

/// One agent configuration to evaluate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedAgent {
    /// Class path of the agent
    pub class_path: String,
    /// Constructor parameters: a list, a mapping, or absent
    #[serde(default)]
    pub params: Option<Value>,
}

impl EvaluatedAgent {
    /// Agent without parameters
    pub fn new(class_path: impl Into<String>) -> Self {
        Self {
            class_path: class_path.into(),
            params: None,
        }
    }

    /// Attach raw parameters (validated when the plan is built)
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Validate the parameter shape and produce the agent spec
    pub fn to_spec(&self) -> Result<AgentSpec> {
        let params = match &self.params {
            Some(value) => AgentParams::from_value(value.clone())?,
            None => None,
        };
        Ok(AgentSpec {
            class_path: self.class_path.clone(),
            params,
        })
    }
}

/// Benchmark configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Where opponent trios come from
    pub field: OpponentField,
    /// Agent configurations to evaluate
    pub evaluated: Vec<EvaluatedAgent>,
    /// Matches per (trio, position) combination
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Share of available parallelism used for workers
    #[serde(default = "default_worker_fraction")]
    pub worker_fraction: f64,
    /// Round cap passed to the engine
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Ask the engine to retain full traces
    #[serde(default)]
    pub store_trace: bool,
    /// Maximum matches in flight at once
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,
    /// Completions between progress milestones
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    /// Average seconds per match, for the up-front estimate
    #[serde(default = "default_estimated_match_secs")]
    pub estimated_match_secs: f64,
    /// External engine launched once per match
    #[serde(default)]
    pub engine: Option<ProcessEngineConfig>,
}

fn default_repetitions() -> u32 {
    10
}

fn default_worker_fraction() -> f64 {
    0.95
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_batch_capacity() -> usize {
    10_000
}

fn default_progress_interval() -> u64 {
    10_000
}

fn default_estimated_match_secs() -> f64 {
    0.004
}

impl HarnessConfig {
    /// Evaluate against every ordered trio of the roster
    pub fn permutations(roster: Vec<String>, evaluated: Vec<EvaluatedAgent>) -> Self {
        Self::with_field(OpponentField::Permutations { roster }, evaluated)
    }

    /// Evaluate against one fixed trio
    pub fn fixed(opponents: Vec<String>, evaluated: Vec<EvaluatedAgent>) -> Self {
        Self::with_field(OpponentField::Fixed { opponents }, evaluated)
    }

    fn with_field(field: OpponentField, evaluated: Vec<EvaluatedAgent>) -> Self {
        Self {
            field,
            evaluated,
            repetitions: default_repetitions(),
            worker_fraction: default_worker_fraction(),
            max_rounds: default_max_rounds(),
            store_trace: false,
            batch_capacity: default_batch_capacity(),
            progress_interval: default_progress_interval(),
            estimated_match_secs: default_estimated_match_secs(),
            engine: None,
        }
    }

    /// Set repetitions per (trio, position)
    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Set the worker utilization fraction
    pub fn with_worker_fraction(mut self, fraction: f64) -> Self {
        self.worker_fraction = fraction;
        self
    }

    /// Set the in-flight capacity
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    /// Set the progress milestone interval
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the per-match duration used for the time estimate
    pub fn with_estimated_match_secs(mut self, secs: f64) -> Self {
        self.estimated_match_secs = secs;
        self
    }

    /// Every class path the run will resolve, opponents first, without repeats
    pub fn class_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        let evaluated = self.evaluated.iter().map(|agent| &agent.class_path);
        for path in self.field.class_paths().iter().chain(evaluated) {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| HarnessError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| HarnessError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every setting that can be checked without an agent catalog
    pub fn validate(&self) -> Result<()> {
        match &self.field {
            OpponentField::Permutations { roster } if roster.len() < 3 => {
                return Err(HarnessError::Configuration(format!(
                    "reference roster needs at least 3 agents, got {}",
                    roster.len()
                )));
            }
            OpponentField::Fixed { opponents } if opponents.len() != 3 => {
                return Err(HarnessError::Configuration(format!(
                    "fixed field needs exactly 3 opponents, got {}",
                    opponents.len()
                )));
            }
            _ => {}
        }

        if self.evaluated.is_empty() {
            return Err(HarnessError::Configuration(
                "no agents to evaluate".to_string(),
            ));
        }
        if self.repetitions == 0 {
            return Err(HarnessError::Configuration(
                "repetitions must be at least 1".to_string(),
            ));
        }
        if !(self.worker_fraction > 0.0 && self.worker_fraction <= 1.0) {
            return Err(HarnessError::Configuration(format!(
                "worker fraction must be in (0, 1], got {}",
                self.worker_fraction
            )));
        }
        if !(self.estimated_match_secs.is_finite() && self.estimated_match_secs >= 0.0) {
            return Err(HarnessError::Configuration(format!(
                "estimated match seconds must be finite and non-negative, got {}",
                self.estimated_match_secs
            )));
        }
        if self.max_rounds == 0 {
            return Err(HarnessError::Configuration(
                "max rounds must be at least 1".to_string(),
            ));
        }
        if self.batch_capacity == 0 || self.progress_interval == 0 {
            return Err(HarnessError::Configuration(
                "batch capacity and progress interval must be positive".to_string(),
            ));
        }

        for agent in &self.evaluated {
            agent.to_spec()?;
        }

        Ok(())
    }
}
