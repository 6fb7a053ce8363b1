//! Benchmark Script Builder
//!
//! Assembles a job's prelude, body and teardown into one program text.
//! The body is wrapped in a counted `while` loop when it must run more than
//! once. Pure text transform: nothing here touches the filesystem.

use crate::error::ContractError;
use crate::model::LoopCount;
use std::borrow::Cow;

/// Loop counter used by generated programs. The prefix keeps it clear of
/// identifiers a user script is likely to define.
pub const LOOP_VARIABLE: &str = "__benchdrive_i";

/// Program text for one job, ready to be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkScript<'a> {
    prelude: &'a str,
    script: &'a str,
    teardown: &'a str,
    loop_count: LoopCount,
}

impl<'a> BenchmarkScript<'a> {
    /// Validate `loop_count` and capture the pieces of the program.
    ///
    /// Zero, negative and non-integer loop counts are rejected here, before
    /// any text is produced.
    pub fn new<L>(
        prelude: &'a str,
        script: &'a str,
        teardown: &'a str,
        loop_count: L,
    ) -> Result<Self, ContractError>
    where
        L: TryInto<LoopCount, Error = ContractError>,
    {
        Ok(Self::from_count(prelude, script, teardown, loop_count.try_into()?))
    }

    /// Build from an already validated loop count.
    pub fn from_count(
        prelude: &'a str,
        script: &'a str,
        teardown: &'a str,
        loop_count: LoopCount,
    ) -> Self {
        Self {
            prelude,
            script,
            teardown,
            loop_count,
        }
    }

    /// Loop count the program was built with
    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    /// Render the full program text
    pub fn render(&self) -> String {
        format!("{}\n{}\n{}\n", self.prelude, self.body(), self.teardown)
    }

    fn body(&self) -> Cow<'a, str> {
        let times = self.loop_count.get();
        if times == 1 {
            return Cow::Borrowed(self.script);
        }

        Cow::Owned(format!(
            "{var} = 0\nwhile {var} < {times}\n  {script}\n  {var} += 1\nend",
            var = LOOP_VARIABLE,
            times = times,
            script = self.script,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_validated_count() {
        let count = LoopCount::try_from(3u64).unwrap();
        let script = BenchmarkScript::from_count("a = 1", "a += 1", "p a", count);
        assert_eq!(script.loop_count(), count);
        assert_eq!(
            script.render(),
            BenchmarkScript::new("a = 1", "a += 1", "p a", 3u64).unwrap().render()
        );
        assert!(script.render().contains("while __benchdrive_i < 3"));
    }

    #[test]
    fn test_single_iteration_has_no_loop() {
        let script = BenchmarkScript::new("a = 1", "a += 1", "p a", 1u64).unwrap();
        assert_eq!(script.render(), "a = 1\na += 1\np a\n");
        assert!(!script.render().contains(LOOP_VARIABLE));
    }

    #[test]
    fn test_multiple_iterations_are_wrapped() {
        let script = BenchmarkScript::new("a = 0", "a += 1", "p a", 3u64).unwrap();
        let rendered = script.render();

        assert_eq!(
            rendered,
            "a = 0\n\
             __benchdrive_i = 0\n\
             while __benchdrive_i < 3\n  a += 1\n  __benchdrive_i += 1\nend\n\
             p a\n"
        );
        // Prelude and teardown appear exactly once, outside the loop
        assert_eq!(rendered.matches("a = 0").count(), 1);
        assert_eq!(rendered.matches("p a").count(), 1);
        assert!(rendered.find("a = 0").unwrap() < rendered.find("while").unwrap());
        assert!(rendered.find("end").unwrap() < rendered.find("p a").unwrap());
    }

    #[test]
    fn test_invalid_loop_counts_rejected() {
        assert_eq!(
            BenchmarkScript::new("", "x", "", 0i64),
            Err(ContractError::InvalidLoopCount("0".to_string()))
        );
        assert!(BenchmarkScript::new("", "x", "", -1i64).is_err());
        assert!(BenchmarkScript::new("", "x", "", 0u64).is_err());
        assert!(matches!(
            BenchmarkScript::new("", "x", "", "x"),
            Err(ContractError::InvalidLoopCount(_))
        ));
    }

    #[test]
    fn test_executes_body_exactly_loop_count_times() {
        // Needs a Ruby interpreter on PATH
        let Ok(ruby) = std::process::Command::new("ruby").arg("-v").output() else {
            return;
        };
        if !ruby.status.success() {
            return;
        }

        for times in [1u64, 2, 7] {
            let program = BenchmarkScript::new("count = 0", "count += 1", "print count", times)
                .unwrap()
                .render();
            let output = std::process::Command::new("ruby")
                .args(["-e", &program])
                .output()
                .unwrap();
            assert_eq!(String::from_utf8_lossy(&output.stdout), times.to_string());
        }
    }
}
