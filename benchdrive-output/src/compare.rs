//! Comparison output
//!
//! Buffers the benchmark phase and, per job, ranks contexts from best to
//! worst with each one's ratio against the best.
//!
//! ```text
//! Comparison:
//! sum
//!        new:     1.024M bytes
//!        old:     2.048M bytes - 2.00x  larger
//! ```

use crate::formatter::{Formatter, FormatterArgs};
use crate::simple::humanize;
use benchdrive_core::{BenchResult, Context, Metric};
use std::io::{self, Write};

/// Ranking formatter
pub struct CompareFormatter {
    sink: Box<dyn Write>,
    name_width: usize,
    metric: Option<Metric>,
    in_benchmark: bool,
    current_context: Option<String>,
    jobs: Vec<(String, Vec<(String, f64)>)>,
}

impl CompareFormatter {
    /// Create a formatter writing to `args.sink`
    pub fn new(args: FormatterArgs) -> Self {
        let name_width = args.context_names.iter().map(String::len).max().unwrap_or(0);
        Self {
            sink: args.sink,
            name_width,
            metric: None,
            in_benchmark: false,
            current_context: None,
            jobs: Vec::with_capacity(args.job_names.len()),
        }
    }

    fn write_comparison(&mut self) -> io::Result<()> {
        let Some(metric) = self.metric.clone() else {
            return Ok(());
        };
        writeln!(self.sink, "Comparison:")?;
        for (job, results) in &mut self.jobs {
            if metric.larger_is_better {
                results.sort_by(|a, b| b.1.total_cmp(&a.1));
            } else {
                results.sort_by(|a, b| a.1.total_cmp(&b.1));
            }
            writeln!(self.sink, "{}", job)?;

            let Some(&(_, best)) = results.first() else {
                continue;
            };
            for (i, (name, value)) in results.iter().enumerate() {
                write!(
                    self.sink,
                    "{:>width$}: {:>10} {}",
                    name,
                    humanize(*value),
                    metric.unit,
                    width = self.name_width + 6
                )?;
                if i > 0 {
                    let ratio = if metric.larger_is_better {
                        best / value
                    } else {
                        value / best
                    };
                    if ratio.is_finite() {
                        write!(self.sink, " - {:.2}x  {}", ratio, metric.worse_word)?;
                    }
                }
                writeln!(self.sink)?;
            }
        }
        self.sink.flush()
    }
}

impl Formatter for CompareFormatter {
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
        self.write_comparison()
    }

    fn enter_job(&mut self, name: &str) -> io::Result<()> {
        if self.in_benchmark {
            self.jobs.push((name.to_string(), Vec::new()));
        }
        Ok(())
    }

    fn enter_context(&mut self, context: &Context) -> io::Result<()> {
        self.current_context = Some(context.name.clone());
        Ok(())
    }

    fn exit_context(&mut self) -> io::Result<()> {
        self.current_context = None;
        Ok(())
    }

    fn report(&mut self, result: &BenchResult) -> io::Result<()> {
        if !self.in_benchmark {
            return Ok(());
        }
        let value = self.metric.as_ref().and_then(|m| result.value(m));
        if let (Some(name), Some(value), Some((_, results))) =
            (self.current_context.clone(), value, self.jobs.last_mut())
        {
            results.push((name, value));
        }
        Ok(())
    }
}
