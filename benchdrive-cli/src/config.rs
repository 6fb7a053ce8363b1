//! Configuration loading from benchdrive.toml
//!
//! Settings can live in a `benchdrive.toml` file in the project root. The file
//! is discovered by walking up from the current directory; command-line flags
//! override whatever it contains.

use benchdrive_core::{ContractError, Executable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the discovered configuration file
pub const CONFIG_FILE_NAME: &str = "benchdrive.toml";

/// Benchdrive configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerSection,
    /// Output configuration
    #[serde(default)]
    pub output: OutputSection,
    /// Executables to benchmark against
    #[serde(default = "default_executables")]
    pub executables: Vec<ExecutableSpec>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            runner: RunnerSection::default(),
            output: OutputSection::default(),
            executables: default_executables(),
        }
    }
}

/// `[runner]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSection {
    /// Runner name looked up in the runner registry
    #[serde(default = "default_runner_type")]
    pub runner_type: String,
    /// Measurements per (job, executable), best one kept
    #[serde(default = "default_repeat_count")]
    pub repeat_count: usize,
    /// Target seconds per measurement for time-based runners
    #[serde(default = "default_run_duration")]
    pub run_duration: u64,
    /// 0 = quiet, 1 = debug logs, 2 = also echo generated scripts
    #[serde(default)]
    pub verbose: u8,
    /// Program used to measure resource usage
    #[serde(default = "default_time_command")]
    pub time_command: PathBuf,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            runner_type: default_runner_type(),
            repeat_count: default_repeat_count(),
            run_duration: default_run_duration(),
            verbose: 0,
            time_command: default_time_command(),
        }
    }
}

fn default_runner_type() -> String {
    "memory".to_string()
}
fn default_repeat_count() -> usize {
    1
}
fn default_run_duration() -> u64 {
    3
}
fn default_time_command() -> PathBuf {
    PathBuf::from("/usr/bin/time")
}

/// `[output]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Formatter name looked up in the formatter registry
    #[serde(default = "default_output_type")]
    pub output_type: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            output_type: default_output_type(),
        }
    }
}

fn default_output_type() -> String {
    "simple".to_string()
}

/// `[[executables]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableSpec {
    /// Context name
    pub name: String,
    /// Program and fixed arguments
    pub command: Vec<String>,
}

impl ExecutableSpec {
    /// Parse `name::cmd args` (or a bare `cmd`, which names itself)
    pub fn parse(entry: &str) -> Self {
        let (name, command) = match entry.split_once("::") {
            Some((name, command)) => (name.trim(), command),
            None => (entry.trim(), entry),
        };
        let command: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        let name = if name.is_empty() {
            command.first().cloned().unwrap_or_default()
        } else {
            name.to_string()
        };
        Self { name, command }
    }

    /// Parse a `;`-separated list of entries, skipping blanks
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split(';')
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Validate into an `Executable`
    pub fn build(&self) -> Result<Executable, ContractError> {
        Executable::new(self.name.clone(), self.command.clone())
    }
}

fn default_executables() -> Vec<ExecutableSpec> {
    vec![ExecutableSpec {
        name: "ruby".to_string(),
        command: vec!["ruby".to_string()],
    }]
}

/// Resolved settings handed to a runner
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Executables every job is measured against
    pub executables: Vec<Executable>,
    /// Measurements per (job, executable); at least 1
    pub repeat_count: usize,
    /// Target seconds per measurement
    pub run_duration: u64,
    /// Verbosity level
    pub verbose: u8,
    /// Program used to measure resource usage
    pub time_command: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            executables: Vec::new(),
            repeat_count: default_repeat_count(),
            run_duration: default_run_duration(),
            verbose: 0,
            time_command: default_time_command(),
        }
    }
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from the current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Fold the file settings into a `RunnerConfig`.
    pub fn runner_config(&self) -> Result<RunnerConfig, ContractError> {
        if self.runner.repeat_count < 1 {
            return Err(ContractError::InvalidRepeatCount(self.runner.repeat_count));
        }
        let executables = self
            .executables
            .iter()
            .map(ExecutableSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RunnerConfig {
            executables,
            repeat_count: self.runner.repeat_count,
            run_duration: self.runner.run_duration,
            verbose: self.runner.verbose,
            time_command: self.runner.time_command.clone(),
        })
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Benchdrive Configuration

[runner]
# Runner type: memory
runner_type = "memory"
# Measurements per job and executable; the best one is reported
repeat_count = 1
# Seconds per measurement for time-based runners
run_duration = 3
# 0 = quiet, 1 = debug logs, 2 = also print generated scripts
verbose = 0
# Resource usage reporter
time_command = "/usr/bin/time"

[output]
# Output type: simple, compare, markdown, record
output_type = "simple"

[[executables]]
name = "ruby"
command = ["ruby"]
"#
        .to_string()
    }
}
