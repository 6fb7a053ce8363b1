//! Formatter plugins
//!
//! A `Formatter` consumes the calls of an `Output` session and decides how
//! results are rendered. Formatters are resolved by name through a
//! `FormatterRegistry` populated at start-up.

use crate::protocol::{OutputError, validate_format_name};
use benchdrive_core::{BenchResult, Context, Metric};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Consumer side of the output protocol.
///
/// Calls arrive already validated: scopes are properly nested and every
/// report covers the declared metrics. Scope hooks default to no-ops.
pub trait Formatter {
    /// Metrics that every following report carries
    fn set_metrics(&mut self, metrics: &[Metric]) -> io::Result<()>;

    /// Warmup phase opened
    fn enter_warmup(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Warmup phase closed
    fn exit_warmup(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Benchmark phase opened
    fn enter_benchmark(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Benchmark phase closed
    fn exit_benchmark(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Job scope opened
    fn enter_job(&mut self, name: &str) -> io::Result<()>;

    /// Job scope closed
    fn exit_job(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Context scope opened
    fn enter_context(&mut self, context: &Context) -> io::Result<()>;

    /// Context scope closed
    fn exit_context(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Result for the innermost (job, context)
    fn report(&mut self, result: &BenchResult) -> io::Result<()>;
}

/// Everything a formatter receives at construction
pub struct FormatterArgs {
    /// Names of the jobs that will be reported, in run order
    pub job_names: Vec<String>,
    /// Names of the contexts (executables) that will be reported
    pub context_names: Vec<String>,
    /// Where rendered output goes
    pub sink: Box<dyn Write>,
}

/// Constructor stored in the registry
pub type FormatterFactory = Box<dyn Fn(FormatterArgs) -> Box<dyn Formatter>>;

/// Name → formatter constructor lookup
#[derive(Default)]
pub struct FormatterRegistry {
    factories: BTreeMap<String, FormatterFactory>,
}

impl FormatterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `simple`, `compare`, `markdown` and `record` formatters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert("compare", |args| Box::new(crate::compare::CompareFormatter::new(args)));
        registry.insert("simple", |args| Box::new(crate::simple::SimpleFormatter::new(args)));
        registry.insert("markdown", |args| {
            Box::new(crate::markdown::MarkdownFormatter::new(args))
        });
        registry.insert("record", |args| Box::new(crate::record::RecordFormatter::new(args)));
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), OutputError>
    where
        F: Fn(FormatterArgs) -> Box<dyn Formatter> + 'static,
    {
        validate_format_name(name)?;
        self.insert(name, factory);
        Ok(())
    }

    fn insert<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(FormatterArgs) -> Box<dyn Formatter> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the formatter registered under `name`
    pub fn create(&self, name: &str, args: FormatterArgs) -> Result<Box<dyn Formatter>, OutputError> {
        validate_format_name(name)?;
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| OutputError::UnknownFormat {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        Ok(factory(args))
    }
}
