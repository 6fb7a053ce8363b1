//! Max resident set size runner
//!
//! Runs each generated script under `time(1)` and reports the peak resident
//! memory of the interpreter process. Linux only.

use super::process::{execute, with_script};
use super::{RunError, Runner};
use crate::config::RunnerConfig;
use benchdrive_core::{
    BenchResult, BenchmarkScript, Executable, Job, LoopCount, Metric, Repeater, ensure_unique_names,
};
use benchdrive_output::Output;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::ffi::{CStr, OsString};
use std::io;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static TIME_OUTPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(?P<user>\d+.\d+)user\s+(?P<system>\d+.\d+)system\s+(?P<elapsed1>\d+):(?P<elapsed2>\d+.\d+)elapsed.+\([^\s]+\s+(?P<maxresident>\d+)maxresident\)k$",
    )
    .expect("time output pattern is valid")
});

/// The metric this runner reports
pub fn max_resident_metric() -> Metric {
    Metric::new("Max resident set size", "bytes", false, "larger")
}

/// Extract `maxresident` (kilobytes) from `time(1)` output and convert to bytes.
pub fn parse_max_resident(output: &str) -> Option<f64> {
    let captures = TIME_OUTPUT.captures(output)?;
    let kilobytes: u64 = captures.name("maxresident")?.as_str().parse().ok()?;
    Some(kilobytes as f64 * 1000.0)
}

/// Measures peak memory of every (job, executable) pair
pub struct MemoryRunner {
    config: RunnerConfig,
    output: Output,
}

impl MemoryRunner {
    /// Create a runner reporting through `output`
    pub fn new(config: RunnerConfig, output: Output) -> Self {
        Self { config, output }
    }

    /// Give back the output session, e.g. to inspect it after a run
    pub fn into_output(self) -> Output {
        self.output
    }

    fn check_environment(&self) -> Result<(), RunError> {
        let sysname = sysname()?;
        if sysname != "Linux" {
            return Err(RunError::EnvironmentUnsupported(format!(
                "memory output is not supported for '{sysname}' for now"
            )));
        }
        if !self.config.time_command.is_file() {
            return Err(RunError::EnvironmentUnsupported(format!(
                "{} is not available",
                self.config.time_command.display()
            )));
        }
        Ok(())
    }
}

impl Runner for MemoryRunner {
    fn run(&mut self, jobs: &[Job]) -> Result<(), RunError> {
        self.check_environment()?;
        ensure_unique_names(jobs)?;

        let metric = max_resident_metric();
        self.output.set_metrics(vec![metric.clone()])?;

        let jobs: Vec<Job> = jobs
            .iter()
            .cloned()
            .map(|job| job.with_default_loop_count(LoopCount::ONE))
            .collect();

        let Self { config, output } = self;
        let config = &*config;
        let repeater = Repeater::new(config.repeat_count)?;
        let planned: usize = jobs
            .iter()
            .map(|job| job.runnable_execs(&config.executables).len())
            .sum();
        info!(
            "Measuring {} job(s), {} measurement(s), repeat count {}",
            jobs.len(),
            planned,
            repeater.repeat_count()
        );

        let pb = progress_bar(planned as u64, config.verbose);

        output.with_benchmark(|out| -> Result<(), RunError> {
            for job in &jobs {
                out.with_job(&job.name, |out| -> Result<(), RunError> {
                    let runnable = job.runnable_execs(&config.executables);
                    let skipped = config.executables.len() - runnable.len();
                    if skipped > 0 {
                        warn!(job = %job.name, "Skipping {} executable(s) excluded by the job", skipped);
                    }
                    for exec in runnable {
                        pb.set_message(format!("{} ({})", job.name, exec.name()));
                        let value = repeater.run(metric.larger_is_better, || {
                            run_benchmark(config, job, exec)
                        })?;
                        debug!(job = %job.name, exec = exec.name(), value, "measured");

                        out.with_context(exec.name(), exec, |out| -> Result<(), RunError> {
                            let mut result =
                                BenchResult::new([(metric.clone(), value)].into_iter().collect());
                            result.loop_count = job.loop_count;
                            out.report(result)?;
                            Ok(())
                        })?;
                        pb.inc(1);
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;

        pb.finish_and_clear();
        output.finish()?;
        Ok(())
    }
}

fn run_benchmark(config: &RunnerConfig, job: &Job, exec: &Executable) -> Result<f64, RunError> {
    let loop_count = job.loop_count.unwrap_or(LoopCount::ONE);
    let script = BenchmarkScript::from_count(&job.prelude, &job.script, &job.teardown, loop_count);

    let output = with_script(&script.render(), config.verbose, |path| {
        let mut command: Vec<OsString> = Vec::with_capacity(exec.command().len() + 2);
        command.push(config.time_command.clone().into());
        command.extend(exec.command().iter().map(OsString::from));
        command.push(path.into());
        execute(&command)
    })?;

    parse_max_resident(&output).ok_or_else(|| RunError::Parse {
        tool: config.time_command.display().to_string(),
        output,
    })
}

fn progress_bar(len: u64, verbose: u8) -> ProgressBar {
    if verbose >= 1 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn sysname() -> io::Result<String> {
    // SAFETY: utsname is plain old data and uname only writes into it.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: uname NUL-terminates every field on success.
    let name = unsafe { CStr::from_ptr(uts.sysname.as_ptr()) };
    Ok(name.to_string_lossy().into_owned())
}
