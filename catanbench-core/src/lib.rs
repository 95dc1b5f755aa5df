//! Catanbench Core - contracts between the harness, engines and agents
//!
//! This crate provides the pieces the benchmark harness consumes:
//! - Agent contract, constructor parameters and agent factories
//! - Agent catalogs that resolve class paths into factories
//! - Game engine contract and the process-per-match engine adapter
//! - Trace navigation and final standings (points, leader, rank)

pub mod agent;
pub mod engine;
pub mod error;
pub mod process;
pub mod registry;
pub mod trace;

// Re-exports for convenient access
pub use agent::{
    boxed_constructor, Agent, AgentConstructor, AgentFactory, AgentParams, AgentSpec,
    ConfigurableAgent, ConfiguredAgent, RemoteAgent,
};
pub use engine::{build_seats, GameEngine, DEFAULT_MAX_ROUNDS};
pub use error::{AgentError, CoreError, EngineError, TraceError};
pub use process::{ProcessCatalog, ProcessEngine, ProcessEngineConfig};
pub use registry::{AgentCatalog, AgentRegistry, RemoteCatalog};
pub use trace::{key_index, seat_id, GameTrace, Standings, SEATS};
