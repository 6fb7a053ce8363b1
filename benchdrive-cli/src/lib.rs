#![warn(missing_docs)]
//! Benchdrive CLI Library
//!
//! Wires the pieces together: configuration layering (`benchdrive.toml` then
//! flags), job-file loading, formatter and runner resolution, and the run
//! itself. `benchdrive::run()` is the binary's entry point.

mod config;
mod jobs;
mod runner;

pub use config::*;
pub use jobs::*;
pub use runner::*;

use anyhow::Context as _;
use benchdrive_output::{FormatterRegistry, Output};
use clap::{ArgAction, Parser};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Benchdrive CLI arguments
#[derive(Parser, Debug, Default)]
#[command(name = "benchdrive")]
#[command(author, version, about = "Benchdrive - measure scripts under one or more interpreters")]
pub struct Cli {
    /// YAML job files
    #[arg(required_unless_present_any = ["list_formats", "list_runners"])]
    pub files: Vec<PathBuf>,

    /// Runner type (default: memory)
    #[arg(short, long)]
    pub runner: Option<String>,

    /// Output type (default: simple)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Executables to compare: "name::command args;name2::command2"
    #[arg(short, long)]
    pub executables: Vec<String>,

    /// Measurements per job and executable; the best one is reported
    #[arg(long)]
    pub repeat_count: Option<usize>,

    /// Seconds per measurement for time-based runners
    #[arg(long)]
    pub run_duration: Option<u64>,

    /// Program used to measure resource usage
    #[arg(long)]
    pub time_command: Option<PathBuf>,

    /// Only run jobs whose name matches one of these regexes
    #[arg(long)]
    pub filter: Vec<String>,

    /// Verbose output (-v debug logs, -vv also print generated scripts)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (default: discover benchdrive.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the available output types and exit
    #[arg(long)]
    pub list_formats: bool,

    /// Print the available runner types and exit
    #[arg(long)]
    pub list_runners: bool,
}

/// Run the Benchdrive CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Benchdrive CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Config errors surface from run_with; logging falls back to the flag.
    let verbose = resolve_config(&cli)
        .map(|config| config.runner.verbose)
        .unwrap_or(cli.verbose);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .init();

    run_with(
        &cli,
        &FormatterRegistry::with_builtins(),
        &RunnerRegistry::with_builtins(),
        Box::new(std::io::stdout()),
    )
}

/// Run with explicit registries, writing results to `sink`.
pub fn run_with(
    cli: &Cli,
    formatters: &FormatterRegistry,
    runners: &RunnerRegistry,
    mut sink: Box<dyn Write>,
) -> anyhow::Result<()> {
    if cli.list_formats || cli.list_runners {
        if cli.list_formats {
            writeln!(sink, "{}", formatters.names().join("\n"))?;
        }
        if cli.list_runners {
            writeln!(sink, "{}", runners.names().join("\n"))?;
        }
        return Ok(());
    }

    let config = resolve_config(cli)?;
    let runner_config = config.runner_config()?;
    let jobs = load_jobs(&cli.files, &cli.filter)?;
    if jobs.is_empty() {
        warn!("No jobs to run");
        return Ok(());
    }

    let job_names = jobs.iter().map(|job| job.name.clone()).collect();
    let context_names = runner_config
        .executables
        .iter()
        .map(|exec| exec.name().to_string())
        .collect();
    info!(
        "Running {} job(s) with the {} runner",
        jobs.len(),
        config.runner.runner_type
    );

    let output = Output::open(
        formatters,
        &config.output.output_type,
        job_names,
        context_names,
        sink,
    )?;
    let mut runner = runners.create(&config.runner.runner_type, runner_config, output)?;
    runner.run(&jobs)?;
    Ok(())
}

/// Tracing filter for a verbosity level
pub fn log_filter(verbose: u8) -> &'static str {
    if verbose >= 1 {
        "benchdrive=debug"
    } else {
        "benchdrive=info"
    }
}

/// Layer configuration: defaults, then the config file, then CLI flags.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<BenchConfig> {
    let mut config = match &cli.config {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BenchConfig::discover().unwrap_or_default(),
    };

    if let Some(runner) = &cli.runner {
        config.runner.runner_type = runner.clone();
    }
    if let Some(output) = &cli.output {
        config.output.output_type = output.clone();
    }
    if !cli.executables.is_empty() {
        config.executables = cli
            .executables
            .iter()
            .flat_map(|list| ExecutableSpec::parse_list(list))
            .collect();
    }
    if let Some(repeat_count) = cli.repeat_count {
        config.runner.repeat_count = repeat_count;
    }
    if let Some(run_duration) = cli.run_duration {
        config.runner.run_duration = run_duration;
    }
    if let Some(time_command) = &cli.time_command {
        config.runner.time_command = time_command.clone();
    }
    if cli.verbose > 0 {
        config.runner.verbose = cli.verbose;
    }
    Ok(config)
}
