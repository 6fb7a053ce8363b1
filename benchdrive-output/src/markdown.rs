//! Markdown table output
//!
//! Buffers benchmark results and prints one GitHub-flavoured table when the
//! benchmark phase closes.

use crate::formatter::{Formatter, FormatterArgs};
use crate::simple::humanize;
use benchdrive_core::{BenchResult, Context, Metric};
use std::io::{self, Write};

/// Markdown table formatter
pub struct MarkdownFormatter {
    sink: Box<dyn Write>,
    context_names: Vec<String>,
    metric: Option<Metric>,
    in_benchmark: bool,
    rows: Vec<(String, Vec<String>)>,
}

impl MarkdownFormatter {
    /// Create a formatter writing to `args.sink`
    pub fn new(args: FormatterArgs) -> Self {
        Self {
            sink: args.sink,
            context_names: args.context_names,
            metric: None,
            in_benchmark: false,
            rows: Vec::with_capacity(args.job_names.len()),
        }
    }

    fn write_table(&mut self) -> io::Result<()> {
        if let Some(metric) = &self.metric {
            writeln!(self.sink, "# {} ({})", metric.name, metric.unit)?;
            writeln!(self.sink)?;
        }

        write!(self.sink, "|    |")?;
        for name in &self.context_names {
            write!(self.sink, " {} |", name)?;
        }
        writeln!(self.sink)?;

        write!(self.sink, "|:---|")?;
        for _ in &self.context_names {
            write!(self.sink, "---:|")?;
        }
        writeln!(self.sink)?;

        for (job, cells) in &self.rows {
            write!(self.sink, "| {} |", job)?;
            for cell in cells {
                write!(self.sink, " {} |", cell)?;
            }
            writeln!(self.sink)?;
        }
        self.sink.flush()
    }
}

impl Formatter for MarkdownFormatter {
    fn set_metrics(&mut self, metrics: &[Metric]) -> io::Result<()> {
        self.metric = metrics.first().cloned();
        Ok(())
    }

    fn enter_benchmark(&mut self) -> io::Result<()> {
        self.in_benchmark = true;
        Ok(())
    }

    fn exit_benchmark(&mut self) -> io::Result<()> {
        self.in_benchmark = false;
        self.write_table()
    }

    fn enter_job(&mut self, name: &str) -> io::Result<()> {
        if self.in_benchmark {
            self.rows.push((name.to_string(), Vec::new()));
        }
        Ok(())
    }

    fn enter_context(&mut self, _context: &Context) -> io::Result<()> {
        Ok(())
    }

    fn report(&mut self, result: &BenchResult) -> io::Result<()> {
        if !self.in_benchmark {
            return Ok(());
        }
        let cell = self
            .metric
            .as_ref()
            .and_then(|m| result.value(m))
            .map(humanize)
            .unwrap_or_else(|| "-".to_string());
        if let Some((_, cells)) = self.rows.last_mut() {
            cells.push(cell);
        }
        Ok(())
    }
}
