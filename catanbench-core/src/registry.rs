//! Agent catalogs - resolve class paths into agent factories
//!
//! Resolution happens once, when a benchmark plan is built, so an unknown
//! class path is reported before any match is dispatched.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::agent::{
    boxed_constructor, AgentConstructor, AgentFactory, AgentSpec, ConfigurableAgent,
    ConfiguredAgent, RemoteAgent,
};
use crate::error::CoreError;

/// Source of agent factories keyed by class path
pub trait AgentCatalog: Send + Sync {
    /// Produce a factory for the given spec
    fn resolve(&self, spec: &AgentSpec) -> Result<Arc<dyn AgentFactory>, CoreError>;
}

/// In-process registry of agent constructors
#[derive(Clone, Debug, Default)]
pub struct AgentRegistry {
    constructors: FxHashMap<String, AgentConstructor>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent type under a class path
    pub fn register<A: ConfigurableAgent>(&mut self, class_path: impl Into<String>) -> &mut Self {
        self.register_fn(class_path, boxed_constructor::<A>)
    }

    /// Register a raw constructor under a class path
    pub fn register_fn(
        &mut self,
        class_path: impl Into<String>,
        constructor: AgentConstructor,
    ) -> &mut Self {
        self.constructors.insert(class_path.into(), constructor);
        self
    }

    /// Check whether a class path is registered
    pub fn contains(&self, class_path: &str) -> bool {
        self.constructors.contains_key(class_path)
    }

    /// Number of registered class paths
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl AgentCatalog for AgentRegistry {
    fn resolve(&self, spec: &AgentSpec) -> Result<Arc<dyn AgentFactory>, CoreError> {
        let constructor = self
            .constructors
            .get(&spec.class_path)
            .copied()
            .ok_or_else(|| CoreError::UnknownAgent {
                class_path: spec.class_path.clone(),
            })?;
        Ok(Arc::new(ConfiguredAgent::new(spec.clone(), constructor)))
    }
}

/// Catalog for engines that construct agents in another process.
///
/// Every class path is accepted; the engine reports unknown ones per match.
/// `ProcessCatalog` checks them with the engine before planning.
#[derive(Clone, Copy, Debug, Default)]
pub struct RemoteCatalog;

impl AgentCatalog for RemoteCatalog {
    fn resolve(&self, spec: &AgentSpec) -> Result<Arc<dyn AgentFactory>, CoreError> {
        Ok(Arc::new(RemoteAgent::new(spec.clone())))
    }
}
