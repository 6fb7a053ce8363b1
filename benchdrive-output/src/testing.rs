//! Test doubles shared by the formatter and protocol tests

use crate::formatter::Formatter;
use benchdrive_core::{BenchResult, Context, Metric};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// In-memory sink that stays readable after being boxed
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Metrics(usize),
    EnterWarmup,
    ExitWarmup,
    EnterBenchmark,
    ExitBenchmark,
    EnterJob(String),
    ExitJob,
    EnterContext(String),
    ExitContext,
    Report(f64),
}

pub type Events = Rc<RefCell<Vec<Event>>>;

/// Formatter that logs every call it receives
pub struct RecordingFormatter {
    events: Events,
    metric: Option<Metric>,
}

impl RecordingFormatter {
    pub fn new() -> (Self, Events) {
        let events = Events::default();
        let formatter = Self {
            events: events.clone(),
            metric: None,
        };
        (formatter, events)
    }

    fn push(&self, event: Event) -> io::Result<()> {
        self.events.borrow_mut().push(event);
        Ok(())
    }
}

impl Formatter for RecordingFormatter {
    fn set_metrics(&mut self, metrics: &[Metric]) -> io::Result<()> {
        self.metric = metrics.first().cloned();
        self.push(Event::Metrics(metrics.len()))
    }

    fn enter_warmup(&mut self) -> io::Result<()> {
        self.push(Event::EnterWarmup)
    }

    fn exit_warmup(&mut self) -> io::Result<()> {
        self.push(Event::ExitWarmup)
    }

    fn enter_benchmark(&mut self) -> io::Result<()> {
        self.push(Event::EnterBenchmark)
    }

    fn exit_benchmark(&mut self) -> io::Result<()> {
        self.push(Event::ExitBenchmark)
    }

    fn enter_job(&mut self, name: &str) -> io::Result<()> {
        self.push(Event::EnterJob(name.to_string()))
    }

    fn exit_job(&mut self) -> io::Result<()> {
        self.push(Event::ExitJob)
    }

    fn enter_context(&mut self, context: &Context) -> io::Result<()> {
        self.push(Event::EnterContext(context.name.clone()))
    }

    fn exit_context(&mut self) -> io::Result<()> {
        self.push(Event::ExitContext)
    }

    fn report(&mut self, result: &BenchResult) -> io::Result<()> {
        let value = self
            .metric
            .as_ref()
            .and_then(|m| result.value(m))
            .unwrap_or(f64::NAN);
        self.push(Event::Report(value))
    }
}
