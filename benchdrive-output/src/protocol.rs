//! Output Protocol
//!
//! The session object a runner reports through. It forwards every call to a
//! `Formatter` and checks the calls against this grammar:
//!
//! ```text
//! metrics = [...]                                   exactly once, first
//! warmup    { job { context { report }* }* }        optional, before benchmark
//! benchmark { job { context { report }* }* }        exactly once
//! ```
//!
//! The only state kept here is the declared metric list and the stack of
//! open scopes. Results are never buffered.

use crate::formatter::{Formatter, FormatterArgs, FormatterRegistry};
use benchdrive_core::{BenchResult, Context, Executable, Metric};
use std::fmt;
use std::io::Write;
use thiserror::Error;
use tracing::debug;

/// Character that may not appear in an output type name
pub const RESERVED_DELIMITER: char = ':';

/// Errors raised by the output protocol
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Output type '{0}' cannot contain ':'")]
    InvalidFormatName(String),

    #[error("Unknown output type '{name}' (available: {available})")]
    UnknownFormat { name: String, available: String },

    #[error("Metrics must be declared before {0}")]
    MetricsNotDeclared(&'static str),

    #[error("Metrics can only be declared once, before any phase")]
    MetricsAlreadyDeclared,

    #[error("Reported metric '{0}' was not declared")]
    UndeclaredMetric(String),

    #[error("Report is missing declared metric '{0}'")]
    MissingMetric(String),

    #[error("Protocol error: cannot {action} at {scope}")]
    InvalidNesting { action: &'static str, scope: String },

    #[error("Formatter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check an output type name before any lookup happens.
pub fn validate_format_name(name: &str) -> Result<(), OutputError> {
    if name.contains(RESERVED_DELIMITER) {
        return Err(OutputError::InvalidFormatName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Scope {
    Warmup,
    Benchmark,
    Job(String),
    Context(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Warmup => write!(f, "warmup"),
            Scope::Benchmark => write!(f, "benchmark"),
            Scope::Job(name) => write!(f, "job '{}'", name),
            Scope::Context(name) => write!(f, "context '{}'", name),
        }
    }
}

/// Session between a runner and a formatter
pub struct Output {
    formatter: Box<dyn Formatter>,
    metrics: Option<Vec<Metric>>,
    scopes: Vec<Scope>,
    warmup_done: bool,
    benchmark_done: bool,
}

impl Output {
    /// Resolve `type_name` in `registry` and construct its formatter.
    ///
    /// Names containing the reserved delimiter are rejected before the
    /// registry is consulted.
    pub fn open(
        registry: &FormatterRegistry,
        type_name: &str,
        job_names: Vec<String>,
        context_names: Vec<String>,
        sink: Box<dyn Write>,
    ) -> Result<Self, OutputError> {
        validate_format_name(type_name)?;
        debug!(output = type_name, jobs = job_names.len(), "opening formatter");
        let formatter = registry.create(
            type_name,
            FormatterArgs {
                job_names,
                context_names,
                sink,
            },
        )?;
        Ok(Self::new(formatter))
    }

    /// Wrap an already constructed formatter
    pub fn new(formatter: Box<dyn Formatter>) -> Self {
        Self {
            formatter,
            metrics: None,
            scopes: Vec::new(),
            warmup_done: false,
            benchmark_done: false,
        }
    }

    /// Declare the metrics every subsequent report must cover.
    pub fn set_metrics(&mut self, metrics: Vec<Metric>) -> Result<(), OutputError> {
        if self.metrics.is_some() || self.warmup_done || self.benchmark_done {
            return Err(OutputError::MetricsAlreadyDeclared);
        }
        self.formatter.set_metrics(&metrics)?;
        self.metrics = Some(metrics);
        Ok(())
    }

    /// Declared metrics, empty until `set_metrics` is called
    pub fn metrics(&self) -> &[Metric] {
        self.metrics.as_deref().unwrap_or_default()
    }

    /// Open the warmup phase
    pub fn enter_warmup(&mut self) -> Result<(), OutputError> {
        self.require_metrics("warmup")?;
        if !self.scopes.is_empty() || self.warmup_done || self.benchmark_done {
            return Err(self.nesting_error("enter warmup"));
        }
        self.formatter.enter_warmup()?;
        self.scopes.push(Scope::Warmup);
        Ok(())
    }

    /// Close the warmup phase
    pub fn exit_warmup(&mut self) -> Result<(), OutputError> {
        self.pop(Scope::Warmup, "exit warmup")?;
        self.warmup_done = true;
        self.formatter.exit_warmup()?;
        Ok(())
    }

    /// Open the benchmark phase
    pub fn enter_benchmark(&mut self) -> Result<(), OutputError> {
        self.require_metrics("benchmark")?;
        if !self.scopes.is_empty() || self.benchmark_done {
            return Err(self.nesting_error("enter benchmark"));
        }
        self.formatter.enter_benchmark()?;
        self.scopes.push(Scope::Benchmark);
        Ok(())
    }

    /// Close the benchmark phase
    pub fn exit_benchmark(&mut self) -> Result<(), OutputError> {
        self.pop(Scope::Benchmark, "exit benchmark")?;
        self.benchmark_done = true;
        self.formatter.exit_benchmark()?;
        Ok(())
    }

    /// Open a job scope inside a phase
    pub fn enter_job(&mut self, name: &str) -> Result<(), OutputError> {
        if !matches!(self.scopes.last(), Some(Scope::Warmup | Scope::Benchmark)) {
            return Err(self.nesting_error("enter a job"));
        }
        self.formatter.enter_job(name)?;
        self.scopes.push(Scope::Job(name.to_string()));
        Ok(())
    }

    /// Close the innermost job scope
    pub fn exit_job(&mut self) -> Result<(), OutputError> {
        match self.scopes.last() {
            Some(Scope::Job(_)) => {
                self.scopes.pop();
                self.formatter.exit_job()?;
                Ok(())
            }
            _ => Err(self.nesting_error("exit a job")),
        }
    }

    /// Open a context scope inside a job
    pub fn enter_context(&mut self, name: &str, executable: &Executable) -> Result<(), OutputError> {
        if !matches!(self.scopes.last(), Some(Scope::Job(_))) {
            return Err(self.nesting_error("enter a context"));
        }
        let context = Context {
            name: name.to_string(),
            executable: executable.clone(),
        };
        self.formatter.enter_context(&context)?;
        self.scopes.push(Scope::Context(context.name));
        Ok(())
    }

    /// Close the innermost context scope
    pub fn exit_context(&mut self) -> Result<(), OutputError> {
        match self.scopes.last() {
            Some(Scope::Context(_)) => {
                self.scopes.pop();
                self.formatter.exit_context()?;
                Ok(())
            }
            _ => Err(self.nesting_error("exit a context")),
        }
    }

    /// Run `f` inside the warmup phase
    pub fn with_warmup<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<OutputError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.enter_warmup()?;
        let value = f(self)?;
        self.exit_warmup()?;
        Ok(value)
    }

    /// Run `f` inside the benchmark phase
    pub fn with_benchmark<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<OutputError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.enter_benchmark()?;
        let value = f(self)?;
        self.exit_benchmark()?;
        Ok(value)
    }

    /// Run `f` inside a job scope
    pub fn with_job<T, E, F>(&mut self, name: &str, f: F) -> Result<T, E>
    where
        E: From<OutputError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.enter_job(name)?;
        let value = f(self)?;
        self.exit_job()?;
        Ok(value)
    }

    /// Run `f` inside a context scope
    pub fn with_context<T, E, F>(&mut self, name: &str, executable: &Executable, f: F) -> Result<T, E>
    where
        E: From<OutputError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.enter_context(name, executable)?;
        let value = f(self)?;
        self.exit_context()?;
        Ok(value)
    }

    /// Emit one result for the innermost (job, context) pair.
    ///
    /// `result.values` must hold exactly the declared metrics.
    pub fn report(&mut self, result: BenchResult) -> Result<(), OutputError> {
        let metrics = self
            .metrics
            .as_ref()
            .ok_or(OutputError::MetricsNotDeclared("report"))?;
        if !matches!(self.scopes.last(), Some(Scope::Context(_))) {
            return Err(self.nesting_error("report"));
        }
        if let Some(extra) = result.values.keys().find(|m| !metrics.contains(m)) {
            return Err(OutputError::UndeclaredMetric(extra.name.clone()));
        }
        if let Some(missing) = metrics.iter().find(|m| !result.values.contains_key(*m)) {
            return Err(OutputError::MissingMetric(missing.name.clone()));
        }

        self.formatter.report(&result)?;
        Ok(())
    }

    /// Check the session ended cleanly: the benchmark phase ran and every
    /// scope was closed.
    pub fn finish(&mut self) -> Result<(), OutputError> {
        if !self.scopes.is_empty() || !self.benchmark_done {
            return Err(self.nesting_error("finish"));
        }
        Ok(())
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn require_metrics(&self, phase: &'static str) -> Result<(), OutputError> {
        if self.metrics.is_none() {
            return Err(OutputError::MetricsNotDeclared(phase));
        }
        Ok(())
    }

    fn pop(&mut self, expected: Scope, action: &'static str) -> Result<(), OutputError> {
        if self.scopes.last() != Some(&expected) {
            return Err(self.nesting_error(action));
        }
        self.scopes.pop();
        Ok(())
    }

    fn nesting_error(&self, action: &'static str) -> OutputError {
        let scope = match self.scopes.last() {
            Some(scope) => scope.to_string(),
            None if self.benchmark_done => "end of session".to_string(),
            None => "top level".to_string(),
        };
        OutputError::InvalidNesting { action, scope }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, RecordingFormatter};
    use fxhash::FxHashMap;

    fn metric() -> Metric {
        Metric::new("Max resident set size", "bytes", false, "larger")
    }

    fn ruby() -> Executable {
        Executable::new("ruby", vec!["ruby".to_string()]).unwrap()
    }

    fn result(value: f64) -> BenchResult {
        let mut values = FxHashMap::default();
        values.insert(metric(), value);
        BenchResult::new(values)
    }

    fn session() -> (Output, crate::testing::Events) {
        let (formatter, events) = RecordingFormatter::new();
        (Output::new(Box::new(formatter)), events)
    }

    #[test]
    fn test_full_session_is_forwarded_in_order() {
        let (mut output, events) = session();
        output.set_metrics(vec![metric()]).unwrap();
        output
            .with_warmup(|out| {
                out.with_job("a", |out| {
                    out.with_context("ruby", &ruby(), |out| out.report(result(2.0)))
                })
            })
            .unwrap();
        output
            .with_benchmark(|out| {
                out.with_job("a", |out| {
                    out.with_context("ruby", &ruby(), |out| out.report(result(1.0)))
                })
            })
            .unwrap();
        output.finish().unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                Event::Metrics(1),
                Event::EnterWarmup,
                Event::EnterJob("a".to_string()),
                Event::EnterContext("ruby".to_string()),
                Event::Report(2.0),
                Event::ExitContext,
                Event::ExitJob,
                Event::ExitWarmup,
                Event::EnterBenchmark,
                Event::EnterJob("a".to_string()),
                Event::EnterContext("ruby".to_string()),
                Event::Report(1.0),
                Event::ExitContext,
                Event::ExitJob,
                Event::ExitBenchmark,
            ]
        );
        assert_eq!(output.depth(), 0);
    }

    #[test]
    fn test_report_before_metrics_rejected() {
        let (mut output, events) = session();
        assert!(matches!(
            output.report(result(1.0)),
            Err(OutputError::MetricsNotDeclared(_))
        ));
        assert!(matches!(
            output.enter_benchmark(),
            Err(OutputError::MetricsNotDeclared(_))
        ));
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_report_missing_metric_rejected() {
        let (mut output, _) = session();
        let other = Metric::new("Iteration per second", "i/s", true, "slower");
        output.set_metrics(vec![metric(), other]).unwrap();
        output.enter_benchmark().unwrap();
        output.enter_job("a").unwrap();
        output.enter_context("ruby", &ruby()).unwrap();

        let err = output.report(result(1.0)).unwrap_err();
        assert!(matches!(err, OutputError::MissingMetric(ref name) if name == "Iteration per second"));
    }

    #[test]
    fn test_report_undeclared_metric_rejected() {
        let (mut output, _) = session();
        output.set_metrics(vec![metric()]).unwrap();
        output.enter_benchmark().unwrap();
        output.enter_job("a").unwrap();
        output.enter_context("ruby", &ruby()).unwrap();

        let mut bad = result(1.0);
        bad.values
            .insert(Metric::new("Elapsed", "s", false, "slower"), 0.5);
        assert!(matches!(
            output.report(bad),
            Err(OutputError::UndeclaredMetric(ref name)) if name == "Elapsed"
        ));
    }

    #[test]
    fn test_report_outside_context_rejected() {
        let (mut output, _) = session();
        output.set_metrics(vec![metric()]).unwrap();
        output.enter_benchmark().unwrap();
        output.enter_job("a").unwrap();
        assert!(matches!(
            output.report(result(1.0)),
            Err(OutputError::InvalidNesting { action: "report", .. })
        ));
    }

    #[test]
    fn test_malformed_nesting_rejected() {
        let (mut output, _) = session();
        output.set_metrics(vec![metric()]).unwrap();

        // Job outside a phase
        assert!(output.enter_job("a").is_err());
        // Context directly inside a phase
        output.enter_benchmark().unwrap();
        assert!(output.enter_context("ruby", &ruby()).is_err());
        // Closing the wrong scope
        output.enter_job("a").unwrap();
        assert!(output.exit_benchmark().is_err());
        assert!(output.exit_context().is_err());
        output.exit_job().unwrap();
        output.exit_benchmark().unwrap();

        // Only one benchmark phase, and no warmup after it
        assert!(output.enter_benchmark().is_err());
        assert!(output.enter_warmup().is_err());
        // Metrics are fixed once the session started
        assert!(matches!(
            output.set_metrics(vec![metric()]),
            Err(OutputError::MetricsAlreadyDeclared)
        ));
    }

    #[test]
    fn test_finish_requires_benchmark_phase() {
        let (mut output, _) = session();
        output.set_metrics(vec![metric()]).unwrap();
        assert!(output.finish().is_err());

        output.enter_benchmark().unwrap();
        assert!(output.finish().is_err());
        output.exit_benchmark().unwrap();
        assert!(output.finish().is_ok());
    }

    #[test]
    fn test_closure_error_propagates() {
        let (mut output, events) = session();
        output.set_metrics(vec![metric()]).unwrap();
        let outcome: Result<(), OutputError> = output.with_benchmark(|out| {
            out.with_job("a", |_| Err(OutputError::MissingMetric("x".to_string())))
        });
        assert!(matches!(outcome, Err(OutputError::MissingMetric(_))));
        assert!(!events.borrow().contains(&Event::ExitBenchmark));
    }

    #[test]
    fn test_delimiter_in_format_name_rejected_before_lookup() {
        let registry = FormatterRegistry::new();
        let err = Output::open(&registry, "foo:bar", vec![], vec![], Box::new(std::io::sink()))
            .err()
            .unwrap();
        assert!(matches!(err, OutputError::InvalidFormatName(ref name) if name == "foo:bar"));

        let err = Output::open(&registry, "foo", vec![], vec![], Box::new(std::io::sink()))
            .err()
            .unwrap();
        assert!(matches!(err, OutputError::UnknownFormat { .. }));
    }
}
