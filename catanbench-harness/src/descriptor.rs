//! Match generation - lazy enumeration of every match in a run
//!
//! Level 3 - Step-level implementation

use std::sync::Arc;

use catanbench_core::{seat_id, AgentCatalog, AgentFactory, AgentSpec, SEATS};
use itertools::Itertools;

use crate::config::{HarnessConfig, OpponentField};
use crate::error::Result;

/// Number of opponents seated around the evaluated agent
pub const OPPONENTS: usize = SEATS - 1;

/// Ordered opponent trio, seated in this order around the evaluated agent
pub type Trio = [Arc<dyn AgentFactory>; OPPONENTS];

/// One evaluated configuration with its aggregation key
#[derive(Debug)]
pub struct EvaluatedEntry {
    /// Position in the configured list (aggregation bucket)
    pub index: usize,
    /// Class path plus rendered parameters
    pub key: String,
    pub factory: Arc<dyn AgentFactory>,
}

/// Everything needed to play one benchmark match
#[derive(Clone, Debug)]
pub struct MatchDescriptor {
    pub opponents: Trio,
    /// Seat index (0-3) taken by the evaluated agent
    pub position: usize,
    pub evaluated: Arc<EvaluatedEntry>,
    /// Repetition number within (trio, position)
    pub repetition: u32,
}

impl MatchDescriptor {
    /// Seat lineup: the trio in order, with the evaluated agent inserted at `position`
    pub fn lineup(&self) -> Vec<Arc<dyn AgentFactory>> {
        let mut seats: Vec<Arc<dyn AgentFactory>> = self.opponents.to_vec();
        seats.insert(self.position, Arc::clone(&self.evaluated.factory));
        seats
    }

    /// Seat identifier of the evaluated agent
    pub fn seat(&self) -> String {
        seat_id(self.position)
    }

    /// Short names of the opponents, for diagnostics
    pub fn opponent_names(&self) -> Vec<&str> {
        self.opponents.iter().map(|o| o.spec().short_name()).collect()
    }
}

/// Resolved benchmark plan: opponent field, evaluated entries and repetitions
#[derive(Debug)]
pub struct MatchPlan {
    field: Vec<Arc<dyn AgentFactory>>,
    permute: bool,
    entries: Vec<Arc<EvaluatedEntry>>,
    repetitions: u32,
}

impl MatchPlan {
    /// Validate the configuration and resolve every class path
    pub fn build(config: &HarnessConfig, catalog: &dyn AgentCatalog) -> Result<Self> {
        config.validate()?;

        let field = config
            .field
            .class_paths()
            .iter()
            .map(|path| catalog.resolve(&AgentSpec::new(path.clone())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let entries = config
            .evaluated
            .iter()
            .enumerate()
            .map(|(index, agent)| -> Result<Arc<EvaluatedEntry>> {
                let spec = agent.to_spec()?;
                let key = spec.evaluation_key();
                let factory = catalog.resolve(&spec)?;
                Ok(Arc::new(EvaluatedEntry {
                    index,
                    key,
                    factory,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            field,
            permute: matches!(config.field, OpponentField::Permutations { .. }),
            entries,
            repetitions: config.repetitions,
        })
    }

    pub fn entries(&self) -> &[Arc<EvaluatedEntry>] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// Number of distinct ordered trios
    pub fn trio_count(&self) -> u64 {
        if !self.permute {
            return 1;
        }
        let n = self.field.len() as u64;
        n * (n - 1) * (n - 2)
    }

    /// Matches each evaluated entry plays
    pub fn matches_per_entry(&self) -> u64 {
        self.trio_count() * SEATS as u64 * self.repetitions as u64
    }

    /// Matches in the whole run
    pub fn total_matches(&self) -> u64 {
        self.matches_per_entry() * self.entries.len() as u64
    }

    /// Up-front wall-clock estimate in minutes
    pub fn estimated_minutes(&self, secs_per_match: f64) -> f64 {
        self.total_matches() as f64 * secs_per_match / 60.0
    }

    /// Iterate every match, entry by entry, then trio, position and repetition.
    ///
    /// The iterator is lazy and can be restarted by calling this again.
    pub fn descriptors(&self) -> impl Iterator<Item = MatchDescriptor> + '_ {
        self.entries.iter().flat_map(move |entry| {
            self.trios().flat_map(move |trio| {
                (0..SEATS).flat_map(move |position| {
                    let trio = trio.clone();
                    (0..self.repetitions).map(move |repetition| MatchDescriptor {
                        opponents: trio.clone(),
                        position,
                        evaluated: Arc::clone(entry),
                        repetition,
                    })
                })
            })
        })
    }

    fn trios(&self) -> Box<dyn Iterator<Item = Trio> + '_> {
        if self.permute {
            Box::new(
                (0..self.field.len())
                    .permutations(OPPONENTS)
                    .map(move |idx| self.trio_at(idx[0], idx[1], idx[2])),
            )
        } else {
            Box::new(std::iter::once(self.trio_at(0, 1, 2)))
        }
    }

    fn trio_at(&self, a: usize, b: usize, c: usize) -> Trio {
        [
            Arc::clone(&self.field[a]),
            Arc::clone(&self.field[b]),
            Arc::clone(&self.field[c]),
        ]
    }
}
