#![warn(missing_docs)]
//! Benchdrive Core - Measurement Model
//!
//! This crate holds the pieces of a benchmark run that do not touch the
//! outside world:
//! - `Executable`, `Job`, `Metric`, `Context` and `BenchResult` data model
//! - `BenchmarkScript` for turning a job into a single runnable program
//! - `Repeater` for best-of-N selection over noisy measurements

mod error;
mod model;
mod repeat;
mod script;

pub use error::ContractError;
pub use model::{BenchResult, Context, Executable, Job, LoopCount, Metric, ensure_unique_names};
pub use repeat::Repeater;
pub use script::{BenchmarkScript, LOOP_VARIABLE};
