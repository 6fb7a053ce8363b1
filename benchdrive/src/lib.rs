#![warn(missing_docs)]
//! # Benchdrive
//!
//! Runs a piece of code under one or more interpreters, measures it, and
//! reports the results through a pluggable formatter.
//!
//! - **Script builder**: prelude, counted loop around the body, teardown
//! - **Best-of-N**: repeated measurements reduced to the best observed value
//! - **Output protocol**: `metrics / benchmark / job / context / report`
//!   sessions, validated as they happen
//! - **Memory runner**: peak resident memory via `time(1)` (Linux)
//!
//! ## Job file
//!
//! ```yaml
//! prelude: "a = (1..1000).to_a"
//! loop_count: 100
//! benchmark:
//!   sum: a.sum
//!   sort: a.sort
//! ```
//!
//! ```text
//! benchdrive -e "ruby::ruby" -o markdown --repeat-count 3 jobs.yml
//! ```

// Re-export the data model and script builder
pub use benchdrive_core::{
    BenchResult, BenchmarkScript, Context, ContractError, Executable, Job, LoopCount, Metric,
    Repeater, ensure_unique_names,
};

// Re-export the output protocol
pub use benchdrive_output::{
    Formatter, FormatterArgs, FormatterFactory, FormatterRegistry, Output, OutputError,
    RESERVED_DELIMITER, humanize, validate_format_name,
};

// Re-export the CLI layer
pub use benchdrive_cli::{
    BenchConfig, Cli, ExecutableSpec, JobFileError, MemoryRunner, RunError, Runner,
    RunnerConfig, RunnerFactory, RunnerRegistry, load_jobs, max_resident_metric,
    parse_max_resident, resolve_config, run, run_with, run_with_cli,
};
