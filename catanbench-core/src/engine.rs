//! Engine contract - the only way the harness touches game rules

use std::sync::Arc;

use crate::agent::{Agent, AgentFactory};
use crate::error::EngineError;
use crate::trace::{seat_id, GameTrace, SEATS};

/// Round cap handed to the engine for every benchmark match
pub const DEFAULT_MAX_ROUNDS: u32 = 200;

/// A game engine able to play one complete match
pub trait GameEngine: Send + Sync {
    /// Play one match.
    ///
    /// `seats` holds one factory per seat, in seat order. The engine assigns
    /// seat identifiers (`J0`..`J3`) and builds the agents itself.
    fn run_match(
        &self,
        seats: &[Arc<dyn AgentFactory>],
        max_rounds: u32,
        store_trace: bool,
    ) -> Result<GameTrace, EngineError>;
}

/// Build one agent per seat, for engines that run agents in-process
pub fn build_seats(seats: &[Arc<dyn AgentFactory>]) -> Result<Vec<Box<dyn Agent>>, EngineError> {
    if seats.len() != SEATS {
        return Err(EngineError::SeatCount {
            expected: SEATS,
            found: seats.len(),
        });
    }

    seats
        .iter()
        .enumerate()
        .map(|(position, factory)| factory.build(&seat_id(position)).map_err(EngineError::from))
        .collect()
}
