//! Simple text output
//!
//! Streams one line per job with one column per context. Only the first
//! declared metric is shown and warmup results are not printed.
//!
//! ```text
//! Max resident set size (bytes):
//!                   ruby-3.2    ruby-3.3
//! array_push         12.345M     11.020M
//! ```

use crate::formatter::{Formatter, FormatterArgs};
use benchdrive_core::{BenchResult, Context, Metric};
use std::io::{self, Write};

const COLUMN_WIDTH: usize = 10;

/// Format a value with an SI suffix and three decimals, e.g. `12.345M`.
pub fn humanize(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return format!("{:.3}", value);
    }
    const SUFFIXES: [&str; 6] = ["", "k", "M", "G", "T", "Q"];
    let scale = ((value.log10() / 3.0).floor() as i32).clamp(0, SUFFIXES.len() as i32 - 1);
    format!(
        "{:.3}{}",
        value / 1000f64.powi(scale),
        SUFFIXES[scale as usize]
    )
}

/// Column-per-context plain text formatter
pub struct SimpleFormatter {
    sink: Box<dyn Write>,
    context_names: Vec<String>,
    name_width: usize,
    metric: Option<Metric>,
    in_benchmark: bool,
}

impl SimpleFormatter {
    /// Create a formatter writing to `args.sink`
    pub fn new(args: FormatterArgs) -> Self {
        let name_width = args.job_names.iter().map(String::len).max().unwrap_or(0);
        Self {
            sink: args.sink,
            context_names: args.context_names,
            name_width,
            metric: None,
            in_benchmark: false,
        }
    }
}

impl Formatter for SimpleFormatter {
    fn set_metrics(&mut self, metrics: &[Metric]) -> io::Result<()> {
        self.metric = metrics.first().cloned();
        Ok(())
    }

    fn enter_benchmark(&mut self) -> io::Result<()> {
        self.in_benchmark = true;
        if let Some(metric) = &self.metric {
            writeln!(self.sink, "{} ({}):", metric.name, metric.unit)?;
        }
        if self.context_names.len() > 1 {
            write!(self.sink, "{:width$}  ", "", width = self.name_width)?;
            for name in &self.context_names {
                write!(self.sink, "{:>width$}  ", name, width = COLUMN_WIDTH)?;
            }
            writeln!(self.sink)?;
        }
        Ok(())
    }

    fn exit_benchmark(&mut self) -> io::Result<()> {
        self.in_benchmark = false;
        self.sink.flush()
    }

    fn enter_job(&mut self, name: &str) -> io::Result<()> {
        if self.in_benchmark {
            write!(self.sink, "{:<width$}  ", name, width = self.name_width)?;
        }
        Ok(())
    }

    fn exit_job(&mut self) -> io::Result<()> {
        if self.in_benchmark {
            writeln!(self.sink)?;
            self.sink.flush()?;
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
        let value = self.metric.as_ref().and_then(|m| result.value(m));
        let text = value.map(humanize).unwrap_or_else(|| "-".to_string());
        write!(self.sink, "{:>width$}  ", text, width = COLUMN_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Output;
    use crate::testing::SharedBuffer;
    use benchdrive_core::Executable;
    use fxhash::FxHashMap;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize(12_345_000.0), "12.345M");
        assert_eq!(humanize(999.0), "999.000");
        assert_eq!(humanize(1_000.0), "1.000k");
        assert_eq!(humanize(0.5), "0.500");
        assert_eq!(humanize(0.0), "0.000");
    }

    #[test]
    fn test_renders_rows_per_job() {
        let buffer = SharedBuffer::default();
        let formatter = SimpleFormatter::new(FormatterArgs {
            job_names: vec!["push".to_string(), "concat".to_string()],
            context_names: vec!["old".to_string(), "new".to_string()],
            sink: Box::new(buffer.clone()),
        });
        let metric = Metric::new("Max resident set size", "bytes", false, "larger");
        let old = Executable::new("old", vec!["ruby".to_string()]).unwrap();
        let new = Executable::new("new", vec!["ruby".to_string()]).unwrap();

        let mut output = Output::new(Box::new(formatter));
        output.set_metrics(vec![metric.clone()]).unwrap();
        let report = |out: &mut Output, value: f64| {
            let mut values = FxHashMap::default();
            values.insert(metric.clone(), value);
            out.report(BenchResult::new(values))
        };
        output
            .with_warmup(|out| {
                out.with_job("push", |out| out.with_context("old", &old, |out| report(out, 1.0)))
            })
            .unwrap();
        output
            .with_benchmark(|out| {
                out.with_job("push", |out| {
                    out.with_context("old", &old, |out| report(out, 12_345_000.0))?;
                    out.with_context("new", &new, |out| report(out, 11_020_000.0))
                })?;
                out.with_job("concat", |out| {
                    out.with_context("old", &old, |out| report(out, 2_000.0))?;
                    out.with_context("new", &new, |out| report(out, 1_500.0))
                })
            })
            .unwrap();

        let text = buffer.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Max resident set size (bytes):");
        assert!(lines[1].contains("old") && lines[1].contains("new"));
        assert!(lines[2].starts_with("push  "));
        assert!(lines[2].contains("12.345M") && lines[2].contains("11.020M"));
        assert!(lines[3].starts_with("concat"));
        assert!(lines[3].contains("2.000k") && lines[3].contains("1.500k"));
        // Warmup value never shows up
        assert!(!text.contains("1.000 "));
        assert_eq!(lines.len(), 4);
    }
}
