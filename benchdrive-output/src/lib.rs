#![warn(missing_docs)]
//! Benchdrive Output - Reporting Protocol
//!
//! Decouples how a measurement is produced from how it is displayed:
//! - `Output`: the session a runner reports through, validated against the
//!   `metrics / warmup / benchmark / job / context / report` grammar
//! - `Formatter`: the consumer side, resolved by name via `FormatterRegistry`
//! - Built-in formatters: `simple`, `compare`, `markdown` and `record` (JSON)

mod compare;
mod formatter;
mod markdown;
mod protocol;
mod record;
mod simple;

#[cfg(test)]
mod testing;

pub use compare::CompareFormatter;
pub use formatter::{Formatter, FormatterArgs, FormatterFactory, FormatterRegistry};
pub use markdown::MarkdownFormatter;
pub use protocol::{Output, OutputError, RESERVED_DELIMITER, validate_format_name};
pub use record::{ContextRecord, JobRecord, RecordFormatter, RunRecord};
pub use simple::{SimpleFormatter, humanize};
