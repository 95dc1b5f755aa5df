//! Shared command setup - configuration loading, engine and catalog construction
//!
//! Level 4 - Configuration

use std::path::Path;

use anyhow::{Context, Result};

use catanbench_core::{ProcessCatalog, ProcessEngine};
use catanbench_harness::HarnessConfig;

/// Load a configuration file, apply command-line overrides and validate it
pub fn load_config(
    path: &Path,
    repetitions: Option<u32>,
    worker_fraction: Option<f64>,
) -> Result<HarnessConfig> {
    let config = HarnessConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    let config = apply_overrides(config, repetitions, worker_fraction);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_overrides(
    mut config: HarnessConfig,
    repetitions: Option<u32>,
    worker_fraction: Option<f64>,
) -> HarnessConfig {
    if let Some(n) = repetitions {
        config.repetitions = n;
    }
    if let Some(fraction) = worker_fraction {
        config.worker_fraction = fraction;
    }
    config
}

/// Process engine described by the configuration
pub fn build_engine(config: &HarnessConfig) -> Result<ProcessEngine> {
    let engine_config = config
        .engine
        .as_ref()
        .context("Configuration has no `engine` command to run matches with")?;
    let engine = ProcessEngine::new(engine_config).context("Invalid engine command")?;
    tracing::debug!("Engine command: {}", engine.command_line());
    Ok(engine)
}

/// Catalog of the configured class paths the engine can load
pub fn build_catalog(engine: &ProcessEngine, config: &HarnessConfig) -> Result<ProcessCatalog> {
    let class_paths = config.class_paths();
    let catalog = ProcessCatalog::from_engine(engine, &class_paths)
        .with_context(|| format!("Engine `{}` could not resolve agents", engine.command_line()))?;
    tracing::debug!("Engine resolved {} class paths", class_paths.len());
    Ok(catalog)
}
