//! Benchmark Data Model
//!
//! Immutable descriptions of what to run (`Executable`, `Job`), what is
//! measured (`Metric`) and what came out (`Context`, `BenchResult`).

use crate::error::ContractError;
use fxhash::{FxHashMap, FxHashSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::num::NonZeroU64;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::{LazyLock, OnceLock};

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").expect("version pattern is valid"));

/// One interpreter/binary invocation prefix under test.
///
/// `name` and `command` never change after construction. The only mutable
/// state is the memoised `description`, filled at most once.
#[derive(Debug, Clone)]
pub struct Executable {
    name: String,
    command: Vec<String>,
    description: OnceLock<String>,
}

impl Executable {
    /// Create an executable. The command must contain at least the program.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Result<Self, ContractError> {
        let name = name.into();
        if command.is_empty() || command[0].is_empty() {
            return Err(ContractError::EmptyCommand(name));
        }
        Ok(Self {
            name,
            command,
            description: OnceLock::new(),
        })
    }

    /// Display name used as the context name in reports
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Program followed by its fixed arguments
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Output of `<command> -v`, computed on first use and cached.
    pub fn description(&self) -> io::Result<&str> {
        if let Some(description) = self.description.get() {
            return Ok(description);
        }

        let output = Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg("-v")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;
        let text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();

        Ok(self.description.get_or_init(|| text))
    }

    /// First `x.y.z` version found in the description
    pub fn version(&self) -> Option<semver::Version> {
        let description = self.description().ok()?;
        VERSION_PATTERN
            .find(description)
            .and_then(|m| semver::Version::parse(m.as_str()).ok())
    }
}

// Equality ignores the cached description.
impl PartialEq for Executable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.command == other.command
    }
}

impl Eq for Executable {}

/// Number of times the benchmark body runs inside one generated program.
///
/// Always a positive integer; zero, negative and non-numeric inputs are
/// rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct LoopCount(NonZeroU64);

impl LoopCount {
    /// A single execution of the body
    pub const ONE: LoopCount = LoopCount(NonZeroU64::MIN);

    /// Raw count
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<u64> for LoopCount {
    type Error = ContractError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        NonZeroU64::new(value)
            .map(LoopCount)
            .ok_or_else(|| ContractError::InvalidLoopCount(value.to_string()))
    }
}

impl TryFrom<i64> for LoopCount {
    type Error = ContractError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map_err(|_| ContractError::InvalidLoopCount(value.to_string()))
            .and_then(LoopCount::try_from)
    }
}

impl FromStr for LoopCount {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ContractError::InvalidLoopCount(format!("{s:?}")))?;
        LoopCount::try_from(value)
    }
}

impl TryFrom<&str> for LoopCount {
    type Error = ContractError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LoopCount> for u64 {
    fn from(count: LoopCount) -> Self {
        count.get()
    }
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named unit of benchmark work
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Unique name within a run
    pub name: String,
    /// Evaluated once before the measured body
    pub prelude: String,
    /// The measured body
    pub script: String,
    /// Evaluated once after the measured body
    pub teardown: String,
    /// `None` lets the runner pick a count
    pub loop_count: Option<LoopCount>,
    /// Names of the executables this job is limited to (empty = all)
    pub executables: Vec<String>,
    /// Minimum executable version this job needs
    pub required_version: Option<semver::Version>,
}

impl Job {
    /// Create a job with an empty prelude/teardown and no loop count.
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prelude: String::new(),
            script: script.into(),
            teardown: String::new(),
            loop_count: None,
            executables: Vec::new(),
            required_version: None,
        }
    }

    /// Return this job with `loop_count` filled in when it was unset.
    pub fn with_default_loop_count(mut self, default: LoopCount) -> Self {
        self.loop_count.get_or_insert(default);
        self
    }

    /// Filter `executables` down to the ones this job can run against.
    ///
    /// An executable is kept when the job's restriction list is empty or
    /// names it, and when its version satisfies `required_version`.
    /// Executables whose version cannot be determined are dropped if a
    /// version is required.
    pub fn runnable_execs<'a>(&self, executables: &'a [Executable]) -> Vec<&'a Executable> {
        executables
            .iter()
            .filter(|exec| self.executables.is_empty() || self.executables.contains(&exec.name))
            .filter(|exec| match &self.required_version {
                None => true,
                Some(required) => exec.version().is_some_and(|v| v >= *required),
            })
            .collect()
    }
}

/// Reject job lists where two jobs share a name.
pub fn ensure_unique_names(jobs: &[Job]) -> Result<(), ContractError> {
    let mut seen = FxHashSet::default();
    for job in jobs {
        if !seen.insert(job.name.as_str()) {
            return Err(ContractError::DuplicateJob(job.name.clone()));
        }
    }
    Ok(())
}

/// Static descriptor of something a runner measures
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Metric {
    /// Human-readable name, e.g. "Max resident set size"
    pub name: String,
    /// Unit of the reported values, e.g. "bytes"
    pub unit: String,
    /// Direction used when picking the best of repeated runs
    pub larger_is_better: bool,
    /// Word describing a worse value, e.g. "slower" or "larger"
    pub worse_word: String,
}

impl Metric {
    /// Create a metric descriptor
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        larger_is_better: bool,
        worse_word: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            larger_is_better,
            worse_word: worse_word.into(),
        }
    }
}

/// The executable a result belongs to, within the enclosing job
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Context name (the executable's name)
    pub name: String,
    /// Executable that produced the result
    pub executable: Executable,
}

/// One measurement for a (job, executable) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchResult {
    /// Value per declared metric
    pub values: FxHashMap<Metric, f64>,
    /// Wall time spent measuring, in seconds
    pub duration: Option<f64>,
    /// Loop count the value was measured with
    pub loop_count: Option<LoopCount>,
    /// Free-form key/value facts about the measuring environment
    pub environment: BTreeMap<String, String>,
}

impl BenchResult {
    /// Result holding only metric values
    pub fn new(values: FxHashMap<Metric, f64>) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    /// Value reported for `metric`
    pub fn value(&self, metric: &Metric) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(name: &str) -> Executable {
        Executable::new(name, vec![name.to_string()]).unwrap()
    }

    #[test]
    fn test_executable_rejects_empty_command() {
        assert_eq!(
            Executable::new("ruby", vec![]),
            Err(ContractError::EmptyCommand("ruby".to_string()))
        );
        assert!(Executable::new("ruby", vec![String::new()]).is_err());
    }

    #[test]
    fn test_description_is_cached() {
        let echo = Executable::new("echo", vec!["echo".to_string(), "version 1.2.3".to_string()])
            .unwrap();
        let first = echo.description().unwrap().to_string();
        assert_eq!(first, "version 1.2.3 -v");
        // Same allocation on the second call
        assert!(std::ptr::eq(
            echo.description().unwrap(),
            echo.description().unwrap()
        ));
        assert_eq!(echo.version(), Some(semver::Version::new(1, 2, 3)));
    }

    #[test]
    fn test_loop_count_validation() {
        assert!(LoopCount::try_from(0i64).is_err());
        assert!(LoopCount::try_from(-1i64).is_err());
        assert!("x".parse::<LoopCount>().is_err());
        assert_eq!("20".parse::<LoopCount>().unwrap().get(), 20);
        assert_eq!(LoopCount::ONE.get(), 1);
    }

    #[test]
    fn test_with_default_loop_count_keeps_explicit_value() {
        let five = LoopCount::try_from(5u64).unwrap();
        let mut job = Job::new("a", "1 + 1");
        job.loop_count = Some(five);
        assert_eq!(job.with_default_loop_count(LoopCount::ONE).loop_count, Some(five));

        let job = Job::new("b", "1 + 1").with_default_loop_count(LoopCount::ONE);
        assert_eq!(job.loop_count, Some(LoopCount::ONE));
    }

    #[test]
    fn test_runnable_execs_by_name() {
        let execs = vec![exec("ruby"), exec("jruby")];
        let mut job = Job::new("a", "nil");
        assert_eq!(job.runnable_execs(&execs).len(), 2);

        job.executables = vec!["jruby".to_string()];
        let runnable = job.runnable_execs(&execs);
        assert_eq!(runnable.len(), 1);
        assert_eq!(runnable[0].name(), "jruby");
    }

    #[test]
    fn test_runnable_execs_by_version() {
        let old = Executable::new("old", vec!["echo".to_string(), "ruby 2.7.1".to_string()])
            .unwrap();
        let new = Executable::new("new", vec!["echo".to_string(), "ruby 3.3.0".to_string()])
            .unwrap();
        let execs = vec![old, new];

        let mut job = Job::new("a", "nil");
        job.required_version = Some(semver::Version::new(3, 0, 0));
        let runnable = job.runnable_execs(&execs);
        assert_eq!(runnable.len(), 1);
        assert_eq!(runnable[0].name(), "new");
    }

    #[test]
    fn test_duplicate_job_names_rejected() {
        let jobs = vec![Job::new("a", "1"), Job::new("b", "2"), Job::new("a", "3")];
        assert_eq!(
            ensure_unique_names(&jobs),
            Err(ContractError::DuplicateJob("a".to_string()))
        );
        assert!(ensure_unique_names(&jobs[..2]).is_ok());
    }
}
