//! Repeat-and-select
//!
//! Runs a measurement a fixed number of times and keeps the best value.
//! Noise in repeated runs is one-sided (scheduling jitter, cold caches), so
//! the best observation is the one closest to steady state.

use crate::error::ContractError;
use std::num::NonZeroUsize;

/// Best-of-N repetition policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repeater {
    repeat_count: NonZeroUsize,
}

impl Repeater {
    /// Create a repeater. `repeat_count` must be at least 1.
    pub fn new(repeat_count: usize) -> Result<Self, ContractError> {
        NonZeroUsize::new(repeat_count)
            .map(|repeat_count| Self { repeat_count })
            .ok_or(ContractError::InvalidRepeatCount(repeat_count))
    }

    /// Number of times `run` calls the measurement
    pub fn repeat_count(&self) -> usize {
        self.repeat_count.get()
    }

    /// Call `measure` exactly `repeat_count` times and return the maximum
    /// (`larger_is_better`) or minimum observed value.
    ///
    /// The first error from `measure` is returned as-is and ends the loop.
    pub fn run<E, F>(&self, larger_is_better: bool, mut measure: F) -> Result<f64, E>
    where
        F: FnMut() -> Result<f64, E>,
    {
        let mut best = measure()?;
        for _ in 1..self.repeat_count.get() {
            let value = measure()?;
            best = if larger_is_better {
                best.max(value)
            } else {
                best.min(value)
            };
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;
    use std::rc::Rc;

    /// Measurement that cycles through `values`, counting its calls
    fn sequence(
        values: &[f64],
    ) -> (impl FnMut() -> Result<f64, Infallible> + '_, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let measure = move || {
            let i = counter.get();
            counter.set(i + 1);
            Ok(values[i % values.len()])
        };
        (measure, calls)
    }

    const VALUES: [f64; 5] = [3.0, 1.0, 4.0, 1.0, 5.0];

    #[test]
    fn test_larger_is_better_picks_max() {
        let (measure, calls) = sequence(&VALUES);
        let best = Repeater::new(5).unwrap().run(true, measure).unwrap();
        assert_eq!(best, 5.0);
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn test_smaller_is_better_picks_min() {
        let (measure, calls) = sequence(&VALUES);
        let best = Repeater::new(5).unwrap().run(false, measure).unwrap();
        assert_eq!(best, 1.0);
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn test_single_repeat() {
        let (measure, calls) = sequence(&VALUES);
        assert_eq!(Repeater::new(1).unwrap().run(true, measure).unwrap(), 3.0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_zero_repeat_count_rejected() {
        assert_eq!(Repeater::new(0), Err(ContractError::InvalidRepeatCount(0)));
    }

    #[test]
    fn test_error_propagates_unmodified() {
        let mut calls = 0;
        let result: Result<f64, String> = Repeater::new(4).unwrap().run(false, || {
            calls += 1;
            if calls == 2 {
                Err("exit status 3".to_string())
            } else {
                Ok(1.0)
            }
        });
        assert_eq!(result, Err("exit status 3".to_string()));
        assert_eq!(calls, 2);
    }
}
