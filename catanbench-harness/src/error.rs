use std::path::PathBuf;

use catanbench_core::CoreError;
use thiserror::Error;

/// Errors that abort a benchmark run
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: {0}")]
    Agent(#[from] CoreError),

    #[error("Failed to read config {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Worker pool failure: {0}")]
    PoolInfrastructure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Whether the error was raised before any match was dispatched
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HarnessError::Configuration(_)
                | HarnessError::Agent(_)
                | HarnessError::ReadConfig { .. }
                | HarnessError::ParseConfig { .. }
        )
    }
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
