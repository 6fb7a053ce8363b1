//! JSON record output
//!
//! Collects every result from both phases and writes a single JSON document
//! when the benchmark phase closes, so a run can be archived or post-processed.

use crate::formatter::{Formatter, FormatterArgs};
use benchdrive_core::{BenchResult, Context, LoopCount, Metric};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Full run record
#[derive(Debug, Serialize)]
pub struct RunRecord {
    /// When the record was written
    pub recorded_at: DateTime<Utc>,
    /// Declared metrics
    pub metrics: Vec<Metric>,
    /// Results of the warmup phase (often empty)
    pub warmup: Vec<JobRecord>,
    /// Results of the benchmark phase
    pub benchmark: Vec<JobRecord>,
}

/// Results for one job
#[derive(Debug, Serialize)]
pub struct JobRecord {
    /// Job name
    pub name: String,
    /// One entry per context
    pub contexts: Vec<ContextRecord>,
}

/// Result for one (job, context) pair
#[derive(Debug, Serialize)]
pub struct ContextRecord {
    /// Context name
    pub name: String,
    /// Executable command line
    pub command: Vec<String>,
    /// Executable version banner, when it could be obtained
    pub description: Option<String>,
    /// Metric name → value
    pub values: BTreeMap<String, f64>,
    /// Measurement wall time in seconds
    pub duration: Option<f64>,
    /// Loop count used
    pub loop_count: Option<LoopCount>,
    /// Environment facts reported alongside the value
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Warmup,
    Benchmark,
}

/// Buffering JSON formatter
pub struct RecordFormatter {
    sink: Box<dyn Write>,
    phase: Option<Phase>,
    current_context: Option<(String, Vec<String>, Option<String>)>,
    record: RunRecord,
}

impl RecordFormatter {
    /// Create a formatter writing to `args.sink`
    pub fn new(args: FormatterArgs) -> Self {
        Self {
            sink: args.sink,
            phase: None,
            current_context: None,
            record: RunRecord {
                recorded_at: Utc::now(),
                metrics: Vec::new(),
                warmup: Vec::new(),
                benchmark: Vec::with_capacity(args.job_names.len()),
            },
        }
    }

    fn jobs(&mut self) -> Option<&mut Vec<JobRecord>> {
        match self.phase? {
            Phase::Warmup => Some(&mut self.record.warmup),
            Phase::Benchmark => Some(&mut self.record.benchmark),
        }
    }
}

impl Formatter for RecordFormatter {
    fn set_metrics(&mut self, metrics: &[Metric]) -> io::Result<()> {
        self.record.metrics = metrics.to_vec();
        Ok(())
    }

    fn enter_warmup(&mut self) -> io::Result<()> {
        self.phase = Some(Phase::Warmup);
        Ok(())
    }

    fn exit_warmup(&mut self) -> io::Result<()> {
        self.phase = None;
        Ok(())
    }

    fn enter_benchmark(&mut self) -> io::Result<()> {
        self.phase = Some(Phase::Benchmark);
        Ok(())
    }

    fn exit_benchmark(&mut self) -> io::Result<()> {
        self.phase = None;
        self.record.recorded_at = Utc::now();
        serde_json::to_writer_pretty(&mut self.sink, &self.record)?;
        writeln!(self.sink)?;
        self.sink.flush()
    }

    fn enter_job(&mut self, name: &str) -> io::Result<()> {
        if let Some(jobs) = self.jobs() {
            jobs.push(JobRecord {
                name: name.to_string(),
                contexts: Vec::new(),
            });
        }
        Ok(())
    }

    fn enter_context(&mut self, context: &Context) -> io::Result<()> {
        let description = context
            .executable
            .description()
            .ok()
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        self.current_context = Some((
            context.name.clone(),
            context.executable.command().to_vec(),
            description,
        ));
        Ok(())
    }

    fn exit_context(&mut self) -> io::Result<()> {
        self.current_context = None;
        Ok(())
    }

    fn report(&mut self, result: &BenchResult) -> io::Result<()> {
        let Some((name, command, description)) = self.current_context.clone() else {
            return Ok(());
        };
        let values = result
            .values
            .iter()
            .map(|(metric, value)| (metric.name.clone(), *value))
            .collect();
        let entry = ContextRecord {
            name,
            command,
            description,
            values,
            duration: result.duration,
            loop_count: result.loop_count,
            environment: result.environment.clone(),
        };
        if let Some(job) = self.jobs().and_then(|jobs| jobs.last_mut()) {
            job.contexts.push(entry);
        }
        Ok(())
    }
}
