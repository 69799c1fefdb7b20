//! Test reporter - console output for suite and registry runs
//!
//! Line formats are stable; tools scrape them.

use colored::*;
use std::io::{self, Write};
use std::time::Duration;

/// A failed test, kept for the end-of-suite failure report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub test: &'static str,
    /// Dispatch result, exit code, or golden check code
    pub code: i32,
    pub signal: Option<i32>,
    /// Captured output; `None` for in-process runs
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
}

/// Writes run progress and summaries to an output sink
pub struct Reporter<W: Write> {
    out: W,
    color: bool,
    timer: bool,
}

impl Reporter<io::Stdout> {
    /// Reporter writing to stdout
    pub fn stdout(color: bool, timer: bool) -> Self {
        Self::new(io::stdout(), color, timer)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, color: bool, timer: bool) -> Self {
        Self { out, color, timer }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn timer(&self) -> bool {
        self.timer
    }

    fn ok(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn failed(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    /// ` => test <suite>::<test> ... ` with no newline
    pub fn test_started(&mut self, suite: &str, test: &str) -> io::Result<()> {
        write!(self.out, " => test {}::{} ... ", suite, test)?;
        self.out.flush()
    }

    pub fn test_passed(&mut self) -> io::Result<()> {
        let ok = self.ok("ok");
        writeln!(self.out, "{}", ok)
    }

    /// Failure of an isolated test; details follow in the failure report
    pub fn test_failed(&mut self) -> io::Result<()> {
        let failed = self.failed("FAILED");
        writeln!(self.out, "{}", failed)
    }

    /// Failure of an in-process test, with its result code
    pub fn test_failed_code(&mut self, code: i32) -> io::Result<()> {
        let failed = self.failed("FAILED");
        writeln!(self.out, "{}, res: {{{}}}", failed, code)
    }

    pub fn suite_completed(&mut self, suite: &str, failures: usize) -> io::Result<()> {
        writeln!(
            self.out,
            "[  Suite  ] {{{}}}: All tests completed. Failures: {{{}}}",
            suite, failures
        )
    }

    /// Reprint captured output of every failure, then the exit code table
    pub fn failure_report(&mut self, suite: &str, failures: &[Failure]) -> io::Result<()> {
        write!(self.out, "\nfailures:\n\n")?;
        for failure in failures {
            writeln!(self.out, "---- {}::{} stdout ----", suite, failure.test)?;
            if let Some(bytes) = &failure.stdout {
                self.out.write_all(bytes)?;
            }
            writeln!(self.out, "---- {}::{} stderr ----", suite, failure.test)?;
            if let Some(bytes) = &failure.stderr {
                self.out.write_all(bytes)?;
            }
        }
        write!(self.out, "\nfailures:\n")?;
        for failure in failures {
            write!(
                self.out,
                "    {}::{}: exit code {{{}}}",
                suite, failure.test, failure.code
            )?;
            if let Some(signal) = failure.signal {
                write!(self.out, ", signal {{{}}}", signal)?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// `test result: <PASSED|FAILED>. <p> passed; <f> failed` line
    pub fn suite_result(&mut self, passed: usize, failed: usize, elapsed: Duration) -> io::Result<()> {
        let status = if failed == 0 {
            self.ok("PASSED")
        } else {
            self.failed("FAILED")
        };
        write!(
            self.out,
            "\ntest result: {}. {} passed; {} failed;",
            status, passed, failed
        )?;
        if self.timer {
            write!(self.out, " elapsed: {:.2}s", elapsed.as_secs_f64())?;
        }
        writeln!(self.out)
    }

    pub fn registry_started(&mut self) -> io::Result<()> {
        writeln!(self.out, "Running all test suites...")
    }

    pub fn suite_started(&mut self, suite: &str, tests: usize) -> io::Result<()> {
        writeln!(self.out, "[  Suite  ] suite {}, {} tests", suite, tests)
    }

    pub fn suite_finished(&mut self, failures: usize) -> io::Result<()> {
        if failures > 0 {
            writeln!(self.out, "[ FAILED  ] Failures: {{{}}}", failures)?;
        } else {
            writeln!(self.out, "[ SUCCESS ]")?;
        }
        writeln!(self.out, "[ DONE    ]")
    }

    pub fn registry_completed(&mut self, failures: usize) -> io::Result<()> {
        writeln!(self.out, "All tests completed. Failures: {{{}}}", failures)?;
        self.out.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
