//! Process engine - one OS process per match
//!
//! The configured command is spawned for every match. It receives a JSON
//! request on stdin and must print the game trace as JSON on stdout. A crash,
//! non-zero exit or hang inside the engine stays confined to that child.
//!
//! The same command answers a resolve request (`{"resolve": [...]}` on stdin,
//! `{"unknown": [...]}` on stdout) so class paths are checked once, before
//! any match is dispatched.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentFactory, AgentParams, AgentSpec, RemoteAgent};
use crate::engine::GameEngine;
use crate::error::{CoreError, EngineError};
use crate::registry::AgentCatalog;
use crate::trace::{seat_id, GameTrace, SEATS};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How long pipe threads may linger once the child is gone
const PIPE_GRACE: Duration = Duration::from_secs(1);

/// How to launch the external engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessEngineConfig {
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Kill the child after this many seconds (None = wait forever)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    max_rounds: u32,
    store_trace: bool,
    agents: Vec<SeatRequest<'a>>,
}

#[derive(Serialize)]
struct SeatRequest<'a> {
    agent_id: String,
    class_path: &'a str,
    params: Option<&'a AgentParams>,
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    resolve: Vec<&'a str>,
}

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    unknown: Vec<String>,
}

/// Engine that runs every match in a fresh child process
#[derive(Clone, Debug)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessEngine {
    /// Create from a launch configuration
    pub fn new(config: &ProcessEngineConfig) -> Result<Self, CoreError> {
        let (program, args) = config.command.split_first().ok_or(CoreError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }

    /// Command line for diagnostics
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Class paths the engine cannot load, in request order
    pub fn unknown_agents(&self, class_paths: &[String]) -> Result<Vec<String>, EngineError> {
        let request = ResolveRequest {
            resolve: class_paths.iter().map(String::as_str).collect(),
        };
        let stdout = self.exchange(serde_json::to_vec(&request)?)?;
        let response: ResolveResponse = serde_json::from_slice(&stdout)?;
        Ok(response.unknown)
    }

    fn spawn(&self) -> Result<Child, EngineError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: self.command_line(),
                source,
            })
    }

    /// Send one request and collect stdout. The timeout covers the stdin write.
    fn exchange(&self, mut payload: Vec<u8>) -> Result<Vec<u8>, EngineError> {
        payload.push(b'\n');

        let mut child = self.spawn()?;
        let started = Instant::now();
        let stdin = spawn_writer(child.stdin.take(), payload);
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match self.wait(&mut child, started) {
            Ok(status) => status,
            Err(err) => {
                // Killed; anything still holding the pipes is a grandchild
                let _ = join_within(stdin, PIPE_GRACE);
                let _ = join_within(stdout, PIPE_GRACE);
                let _ = join_within(stderr, PIPE_GRACE);
                return Err(err);
            }
        };

        // An engine that exits without reading is judged by its status
        let _ = join_within(stdin, PIPE_GRACE);
        let stdout = join_within(stdout, PIPE_GRACE).ok_or(EngineError::PipesHeld)??;
        let stderr = join_within(stderr, PIPE_GRACE).ok_or(EngineError::PipesHeld)??;

        if !status.success() {
            return Err(EngineError::Exit {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        tracing::trace!(bytes = stdout.len(), "engine output received");
        Ok(stdout)
    }

    fn wait(&self, child: &mut Child, started: Instant) -> Result<ExitStatus, EngineError> {
        let Some(limit) = self.timeout else {
            return Ok(child.wait()?);
        };

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if started.elapsed() >= limit {
                // Already-exited races are harmless here
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Timeout {
                    secs: limit.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl GameEngine for ProcessEngine {
    fn run_match(
        &self,
        seats: &[Arc<dyn AgentFactory>],
        max_rounds: u32,
        store_trace: bool,
    ) -> Result<GameTrace, EngineError> {
        if seats.len() != SEATS {
            return Err(EngineError::SeatCount {
                expected: SEATS,
                found: seats.len(),
            });
        }

        let request = MatchRequest {
            max_rounds,
            store_trace,
            agents: seats
                .iter()
                .enumerate()
                .map(|(position, factory)| SeatRequest {
                    agent_id: seat_id(position),
                    class_path: &factory.spec().class_path,
                    params: factory.spec().params.as_ref(),
                })
                .collect(),
        };

        let stdout = self.exchange(serde_json::to_vec(&request)?)?;
        Ok(serde_json::from_slice(&stdout)?)
    }
}

/// Catalog of class paths the engine process confirmed it can load
#[derive(Clone, Debug, Default)]
pub struct ProcessCatalog {
    known: FxHashSet<String>,
}

impl ProcessCatalog {
    /// Ask the engine about every class path a run will use
    pub fn from_engine(engine: &ProcessEngine, class_paths: &[String]) -> Result<Self, EngineError> {
        let unknown: FxHashSet<String> = engine.unknown_agents(class_paths)?.into_iter().collect();
        let known = class_paths
            .iter()
            .filter(|path| !unknown.contains(*path))
            .cloned()
            .collect();
        Ok(Self { known })
    }

    pub fn contains(&self, class_path: &str) -> bool {
        self.known.contains(class_path)
    }
}

impl AgentCatalog for ProcessCatalog {
    fn resolve(&self, spec: &AgentSpec) -> Result<Arc<dyn AgentFactory>, CoreError> {
        if !self.known.contains(&spec.class_path) {
            return Err(CoreError::UnknownAgent {
                class_path: spec.class_path.clone(),
            });
        }
        Ok(Arc::new(RemoteAgent::new(spec.clone())))
    }
}

fn spawn_writer(pipe: Option<ChildStdin>, payload: Vec<u8>) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Some(mut pipe) = pipe {
            // Broken pipe means the child stopped reading
            let _ = pipe.write_all(&payload);
        }
    })
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

/// Join a pipe thread, giving up after `grace`
fn join_within<T>(handle: JoinHandle<T>, grace: Duration) -> Option<T> {
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!("engine pipe still open after {:?}, detaching its thread", grace);
            return None;
        }
        thread::sleep(POLL_INTERVAL);
    }
    handle.join().ok()
}
