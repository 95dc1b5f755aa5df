//! Agent contract and agent factories
//!
//! Agents are opaque strategies. The harness never calls into their play
//! logic; it only hands the engine a factory per seat, and the engine
//! builds the agent once it has assigned the seat identifier.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, CoreError};

/// A constructed agent sitting at one seat of a match
pub trait Agent: Send {
    /// Seat identifier assigned by the engine (e.g. "J2")
    fn agent_id(&self) -> &str;

    /// Access to the concrete type, for engines that define the play API
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Extra constructor arguments fixed when the benchmark is configured
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentParams {
    /// Passed after the agent id, in order
    Positional(Vec<Value>),
    /// Passed after the agent id, by name
    Named(Map<String, Value>),
}

impl AgentParams {
    /// Interpret a raw JSON value as constructor parameters.
    ///
    /// `null` means no parameters; lists and mappings are accepted; any
    /// other shape is a configuration error.
    pub fn from_value(value: Value) -> Result<Option<Self>, CoreError> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) => Ok(Some(AgentParams::Positional(items))),
            Value::Object(map) => Ok(Some(AgentParams::Named(map))),
            other => Err(CoreError::InvalidParams {
                found: other.to_string(),
            }),
        }
    }

    /// Positional argument by index
    pub fn positional(&self, index: usize) -> Option<&Value> {
        match self {
            AgentParams::Positional(items) => items.get(index),
            AgentParams::Named(_) => None,
        }
    }

    /// Named argument by key
    pub fn named(&self, key: &str) -> Option<&Value> {
        match self {
            AgentParams::Named(map) => map.get(key),
            AgentParams::Positional(_) => None,
        }
    }
}

/// Compact JSON; mapping keys keep their configured order
impl fmt::Display for AgentParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentParams::Positional(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            AgentParams::Named(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", Value::String(key.clone()), value)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Class identity plus optional construction parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub class_path: String,
    #[serde(default)]
    pub params: Option<AgentParams>,
}

impl AgentSpec {
    /// Spec without parameters
    pub fn new(class_path: impl Into<String>) -> Self {
        Self {
            class_path: class_path.into(),
            params: None,
        }
    }

    /// Attach constructor parameters
    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Identity under which outcomes for this configuration are aggregated
    pub fn evaluation_key(&self) -> String {
        match &self.params {
            Some(params) => format!("{}{}", self.class_path, params),
            None => self.class_path.clone(),
        }
    }

    /// Final path segment, used for short display names
    pub fn short_name(&self) -> &str {
        self.class_path
            .rsplit('.')
            .next()
            .unwrap_or(&self.class_path)
    }
}

/// Builds a fresh agent once the engine has assigned a seat
pub trait AgentFactory: Send + Sync + fmt::Debug {
    /// What this factory builds
    fn spec(&self) -> &AgentSpec;

    /// Construct the agent for the given seat identifier
    fn build(&self, agent_id: &str) -> Result<Box<dyn Agent>, AgentError>;
}

/// Base constructor: seat identifier first, configured parameters after
pub type AgentConstructor = fn(&str, Option<&AgentParams>) -> Result<Box<dyn Agent>, AgentError>;

/// Agents that can be registered by type
pub trait ConfigurableAgent: Agent + Sized + 'static {
    fn construct(agent_id: &str, params: Option<&AgentParams>) -> Result<Self, AgentError>;
}

/// Type-erased constructor for a [`ConfigurableAgent`]
pub fn boxed_constructor<A: ConfigurableAgent>(
    agent_id: &str,
    params: Option<&AgentParams>,
) -> Result<Box<dyn Agent>, AgentError> {
    A::construct(agent_id, params).map(|agent| Box::new(agent) as Box<dyn Agent>)
}

/// Factory that partially applies stored parameters ahead of the seat id
#[derive(Clone, Debug)]
pub struct ConfiguredAgent {
    spec: AgentSpec,
    constructor: AgentConstructor,
}

impl ConfiguredAgent {
    pub fn new(spec: AgentSpec, constructor: AgentConstructor) -> Self {
        Self { spec, constructor }
    }
}

impl AgentFactory for ConfiguredAgent {
    fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    fn build(&self, agent_id: &str) -> Result<Box<dyn Agent>, AgentError> {
        (self.constructor)(agent_id, self.spec.params.as_ref())
    }
}

/// Factory for agents that live inside an external engine process.
///
/// Only the spec crosses the process boundary; building locally fails.
#[derive(Clone, Debug)]
pub struct RemoteAgent {
    spec: AgentSpec,
}

impl RemoteAgent {
    pub fn new(spec: AgentSpec) -> Self {
        Self { spec }
    }
}

impl AgentFactory for RemoteAgent {
    fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    fn build(&self, _agent_id: &str) -> Result<Box<dyn Agent>, AgentError> {
        Err(AgentError::NotLocal {
            class_path: self.spec.class_path.clone(),
        })
    }
}
