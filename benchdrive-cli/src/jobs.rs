//! Job files
//!
//! Loads benchmark definitions from YAML:
//!
//! ```yaml
//! prelude: "a = [1, 2, 3]"
//! loop_count: 1000
//! benchmark:
//!   sum: a.sum
//!   max: a.max
//! ```
//!
//! `benchmark` may be a single script, a map of name to script, or a list whose
//! items are scripts or `{name, script, loop_count, prelude}` tables.

use benchdrive_core::{ContractError, Job, LoopCount, ensure_unique_names};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Failure to turn job files into jobs
#[derive(Debug, Error)]
pub enum JobFileError {
    #[error("Failed to read job file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid job file {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Invalid filter: {0}")]
    Filter(#[from] regex::Error),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    #[serde(default)]
    prelude: String,
    #[serde(default)]
    teardown: String,
    #[serde(default)]
    loop_count: Option<LoopCount>,
    #[serde(default)]
    required_version: Option<String>,
    #[serde(default)]
    executables: Vec<String>,
    benchmark: BenchmarkSpec,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BenchmarkSpec {
    Single(String),
    List(Vec<EntrySpec>),
    Named(serde_yaml::Mapping),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntrySpec {
    Script(String),
    Table {
        name: Option<String>,
        script: String,
        #[serde(default)]
        loop_count: Option<LoopCount>,
        #[serde(default)]
        prelude: Option<String>,
    },
}

/// Parse the YAML text of a job file. `path` is used for error messages only.
pub fn parse_jobs(yaml: &str, path: &Path) -> Result<Vec<Job>, JobFileError> {
    let file: JobFile = serde_yaml::from_str(yaml).map_err(|source| JobFileError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |message: String| JobFileError::Invalid {
        path: path.to_path_buf(),
        message,
    };

    let required_version = file
        .required_version
        .as_deref()
        .map(|v| semver::Version::parse(v.trim()))
        .transpose()
        .map_err(|e| invalid(format!("required_version: {e}")))?;

    let entries: Vec<(String, String, Option<LoopCount>, Option<String>)> = match file.benchmark {
        BenchmarkSpec::Single(script) => vec![(script.clone(), script, None, None)],
        BenchmarkSpec::List(items) => items
            .into_iter()
            .map(|item| match item {
                EntrySpec::Script(script) => (script.clone(), script, None, None),
                EntrySpec::Table {
                    name,
                    script,
                    loop_count,
                    prelude,
                } => (name.unwrap_or_else(|| script.clone()), script, loop_count, prelude),
            })
            .collect(),
        BenchmarkSpec::Named(map) => map
            .into_iter()
            .map(|(name, script)| match (name, script) {
                (serde_yaml::Value::String(name), serde_yaml::Value::String(script)) => {
                    Ok((name, script, None, None))
                }
                (name, _) => Err(invalid(format!(
                    "benchmark entry {name:?} must map a name to a script"
                ))),
            })
            .collect::<Result<_, _>>()?,
    };

    if entries.is_empty() {
        return Err(invalid("no benchmark defined".to_string()));
    }

    let jobs = entries
        .into_iter()
        .map(|(name, script, loop_count, prelude)| Job {
            name,
            prelude: join_prelude(&file.prelude, prelude.as_deref()),
            script,
            teardown: file.teardown.clone(),
            loop_count: loop_count.or(file.loop_count),
            executables: file.executables.clone(),
            required_version: required_version.clone(),
        })
        .collect();
    Ok(jobs)
}

fn join_prelude(shared: &str, own: Option<&str>) -> String {
    match own {
        Some(own) if !shared.is_empty() => format!("{shared}\n{own}"),
        Some(own) => own.to_string(),
        None => shared.to_string(),
    }
}

/// Read and parse one job file
pub fn load_job_file(path: impl AsRef<Path>) -> Result<Vec<Job>, JobFileError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| JobFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let jobs = parse_jobs(&content, path)?;
    debug!("Loaded {} job(s) from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// Load every file, keep the jobs matching any filter, and check names are unique.
///
/// An empty filter list keeps everything.
pub fn load_jobs(paths: &[PathBuf], filters: &[String]) -> Result<Vec<Job>, JobFileError> {
    let filters = filters
        .iter()
        .map(|f| Regex::new(f))
        .collect::<Result<Vec<_>, _>>()?;

    let mut jobs = Vec::new();
    for path in paths {
        jobs.extend(load_job_file(path)?);
    }
    ensure_unique_names(&jobs)?;

    if !filters.is_empty() {
        jobs.retain(|job| filters.iter().any(|re| re.is_match(&job.name)));
    }
    Ok(jobs)
}
