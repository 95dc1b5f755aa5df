//! Error types shared by the agent, engine and trace layers

use thiserror::Error;

/// Setup-time errors: bad agent identities or parameter shapes
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown agent class: {class_path}")]
    UnknownAgent { class_path: String },

    #[error("Agent parameters must be a list or a mapping, got {found}")]
    InvalidParams { found: String },

    #[error("Engine command is empty")]
    EmptyCommand,
}

/// Failure to construct an agent for a seat
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to construct {class_path} for seat {agent_id}: {reason}")]
    Construction {
        class_path: String,
        agent_id: String,
        reason: String,
    },

    #[error("Agent {class_path} is only constructible inside an external engine process")]
    NotLocal { class_path: String },
}

impl AgentError {
    /// Construction failure with a free-form reason
    pub fn construction(class_path: &str, agent_id: &str, reason: impl Into<String>) -> Self {
        AgentError::Construction {
            class_path: class_path.to_string(),
            agent_id: agent_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure while the engine simulates one match
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Agent construction failed: {0}")]
    Agent(#[from] AgentError),

    #[error("Expected {expected} seats, got {found}")]
    SeatCount { expected: usize, found: usize },

    #[error("Failed to spawn engine command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("Engine exceeded the {secs}s match timeout")]
    Timeout { secs: u64 },

    #[error("Engine exited but its output pipes are still held open")]
    PipesHeld,

    #[error("Failed to decode engine output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Simulation error: {0}")]
    Simulation(String),
}

/// Malformed or incomplete game trace
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Trace contains no rounds")]
    NoRounds,

    #[error("Round {round} contains no turns")]
    NoTurns { round: String },

    #[error("Key `{key}` has no numeric suffix")]
    BadKey { key: String },

    #[error("Trace is missing {path}")]
    MissingField { path: String },

    #[error("Seat {seat} missing from final victory points")]
    MissingSeat { seat: String },

    #[error("Seat {seat} has non-integer victory points: {value}")]
    BadPoints { seat: String, value: String },
}
