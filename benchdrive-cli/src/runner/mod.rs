//! Runners
//!
//! A runner turns jobs into measurements and reports them through an
//! `Output`. Runners are resolved by name from a `RunnerRegistry`.

mod memory;
mod process;

pub use memory::{MemoryRunner, max_resident_metric, parse_max_resident};

use crate::config::RunnerConfig;
use benchdrive_core::{ContractError, Job};
use benchdrive_output::{Output, OutputError};
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

/// Anything that aborts a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Environment unsupported: {0}")]
    EnvironmentUnsupported(String),

    #[error("Failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to execute: {command} (status: {status})\n{output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Unexpected format given from {tool}:\n{output}")]
    Parse { tool: String, output: String },

    #[error("Unknown runner type '{name}' (available: {available})")]
    UnknownRunner { name: String, available: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Something that measures jobs and reports the results.
pub trait Runner {
    /// Measure every job against its runnable executables.
    fn run(&mut self, jobs: &[Job]) -> Result<(), RunError>;
}

/// Builds a runner from resolved settings and an open output session
pub type RunnerFactory = Box<dyn Fn(RunnerConfig, Output) -> Box<dyn Runner>>;

/// Runner type name → factory
pub struct RunnerRegistry {
    factories: BTreeMap<String, RunnerFactory>,
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl RunnerRegistry {
    /// Registry with no runners
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding the `memory` runner
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("memory", |config, output| {
            Box::new(MemoryRunner::new(config, output))
        });
        registry
    }

    /// Add or replace a runner
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(RunnerConfig, Output) -> Box<dyn Runner> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the runner registered under `name`
    pub fn create(
        &self,
        name: &str,
        config: RunnerConfig,
        output: Output,
    ) -> Result<Box<dyn Runner>, RunError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RunError::UnknownRunner {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        Ok(factory(config, output))
    }
}
