//! Executor - run suites and registries, aggregate failures, report
//!
//! Tests run strictly in registration order, one at a time. A failing test
//! or suite never stops the run; failures are counted and reported at the
//! end of each suite.

use crate::dispatch;
use crate::golden::GoldenSuffixes;
use crate::registry::{Registry, Suite};
use crate::report::{Failure, Reporter};
use crate::test::TestCase;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;

#[cfg(unix)]
use crate::golden::{self, CheckReport, Comparison};
#[cfg(unix)]
use crate::isolate;

/// Whether per-test process isolation exists on this platform
pub const ISOLATION_AVAILABLE: bool = cfg!(unix);

/// What to do with the output of successful isolated tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoldenMode {
    #[default]
    Off,
    /// Write captured output as the new golden files
    Record,
    /// Compare captured output against existing golden files
    Verify,
}

/// Options for a suite or registry run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run each test in its own child process
    pub isolate: bool,
    pub golden: GoldenMode,
    /// Directory golden files are read from and written to
    pub golden_dir: PathBuf,
    pub suffixes: GoldenSuffixes,
    pub color: bool,
    /// Report elapsed time per suite
    pub timer: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            isolate: ISOLATION_AVAILABLE,
            golden: GoldenMode::Off,
            golden_dir: PathBuf::from("."),
            suffixes: GoldenSuffixes::default(),
            color: true,
            timer: true,
        }
    }
}

impl RunOptions {
    pub fn with_isolate(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    pub fn with_golden(mut self, golden: GoldenMode) -> Self {
        self.golden = golden;
        self
    }

    pub fn with_golden_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.golden_dir = dir.into();
        self
    }

    pub fn with_suffixes(mut self, suffixes: GoldenSuffixes) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_timer(mut self, timer: bool) -> Self {
        self.timer = timer;
        self
    }

    /// Build a stdout reporter matching these options
    pub fn reporter(&self) -> Reporter<io::Stdout> {
        Reporter::stdout(self.color, self.timer)
    }

    fn isolated(&self) -> bool {
        self.isolate && ISOLATION_AVAILABLE
    }
}

/// Result of running one suite
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub name: &'static str,
    pub passed: usize,
    pub failures: Vec<Failure>,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Look up the failure entry of a test
    pub fn failure(&self, test: &str) -> Option<&Failure> {
        self.failures.iter().find(|f| f.test == test)
    }
}

/// Result of running a whole registry
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub suites: Vec<SuiteReport>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.suites.iter().map(|s| s.passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.suites.iter().map(SuiteReport::failed).sum()
    }

    pub fn suite(&self, name: &str) -> Option<&SuiteReport> {
        self.suites.iter().find(|s| s.name == name)
    }
}

/// Run a suite, reporting to stdout, and return the number of failures
pub fn run_suite(suite: &Suite, isolate: bool) -> io::Result<usize> {
    let options = RunOptions::default().with_isolate(isolate);
    let mut reporter = options.reporter();
    run_suite_with(suite, &options, &mut reporter).map(|report| report.failed())
}

/// Run a registry, reporting to stdout, and return the number of failures
///
/// With `record` set, the output of every successful isolated test is saved
/// as `<test name><suffix>` in the current directory.
pub fn run_registry(
    registry: &Registry,
    isolate: bool,
    record: bool,
    suffixes: GoldenSuffixes,
) -> io::Result<usize> {
    let options = RunOptions::default()
        .with_isolate(isolate)
        .with_golden(if record {
            GoldenMode::Record
        } else {
            GoldenMode::Off
        })
        .with_suffixes(suffixes);
    let mut reporter = options.reporter();
    run_registry_with(registry, &options, &mut reporter).map(|summary| summary.failed())
}

/// Run every suite of a registry in order
pub fn run_registry_with<W: Write>(
    registry: &Registry,
    options: &RunOptions,
    reporter: &mut Reporter<W>,
) -> io::Result<RunSummary> {
    let mut summary = RunSummary::default();

    reporter.registry_started()?;
    for suite in registry.suites() {
        reporter.suite_started(suite.name(), suite.len())?;
        let report = run_suite_with(suite, options, reporter)?;
        reporter.suite_finished(report.failed())?;
        summary.suites.push(report);
    }
    reporter.registry_completed(summary.failed())?;

    Ok(summary)
}

/// Run every test of a suite in order
pub fn run_suite_with<W: Write>(
    suite: &Suite,
    options: &RunOptions,
    reporter: &mut Reporter<W>,
) -> io::Result<SuiteReport> {
    if options.isolate && !ISOLATION_AVAILABLE {
        warn!(
            target: "proba::executor",
            suite = suite.name(),
            "process isolation is not available on this platform, running in-process"
        );
    }
    if options.golden != GoldenMode::Off && !options.isolated() {
        warn!(
            target: "proba::executor",
            suite = suite.name(),
            "golden files need isolated runs, ignoring {:?}",
            options.golden
        );
    }

    let start = Instant::now();
    let mut passed = 0;
    let mut failures = Vec::new();

    for test in suite.tests() {
        reporter.test_started(suite.name(), test.name)?;
        let failure = if options.isolated() {
            run_isolated_test(test, options)
        } else {
            run_in_process(test)
        };
        match failure {
            None => {
                reporter.test_passed()?;
                passed += 1;
            }
            Some(failure) => {
                if options.isolated() {
                    reporter.test_failed()?;
                } else {
                    reporter.test_failed_code(failure.code)?;
                }
                failures.push(failure);
            }
        }
    }

    let elapsed = start.elapsed();
    reporter.suite_completed(suite.name(), failures.len())?;
    if options.isolated() {
        reporter.failure_report(suite.name(), &failures)?;
    }
    reporter.suite_result(passed, failures.len(), elapsed)?;

    Ok(SuiteReport {
        name: suite.name(),
        passed,
        failures,
        elapsed,
    })
}

fn run_in_process(test: &TestCase) -> Option<Failure> {
    let code = dispatch::run_test_catching(test);
    (code != 0).then(|| Failure {
        test: test.name,
        code,
        signal: None,
        stdout: None,
        stderr: None,
    })
}

#[cfg(unix)]
fn run_isolated_test(test: &TestCase, options: &RunOptions) -> Option<Failure> {
    let mut outcome = isolate::run_isolated(test);
    let stdout = drain(test.name, "stdout", outcome.read_stdout());
    let stderr = drain(test.name, "stderr", outcome.read_stderr());
    // Captured files are released here; the bytes are all we keep.
    drop(outcome.stdout.take());
    drop(outcome.stderr.take());

    let mut code = outcome.exit_code;
    if code == 0 {
        let (stdout_path, stderr_path) =
            golden::golden_paths(&options.golden_dir, test.name, &options.suffixes);
        match options.golden {
            GoldenMode::Off => {}
            GoldenMode::Record => {
                for (bytes, path) in [(&stdout, &stdout_path), (&stderr, &stderr_path)] {
                    if let Err(e) = golden::record(&mut bytes.as_slice(), path) {
                        warn!(target: "proba::executor", test = test.name, "{}", e);
                    }
                }
            }
            GoldenMode::Verify => {
                let report = CheckReport {
                    exit_code: 0,
                    stdout: Some(golden::compare(&mut stdout.as_slice(), &stdout_path)),
                    stderr: Some(golden::compare(&mut stderr.as_slice(), &stderr_path)),
                };
                if report.stdout == Some(Comparison::NotFound)
                    || report.stderr == Some(Comparison::NotFound)
                {
                    warn!(target: "proba::executor", test = test.name, "no golden baseline");
                }
                code = report.code();
            }
        }
    }

    (code != 0).then(|| Failure {
        test: test.name,
        code,
        signal: outcome.signal,
        stdout: Some(stdout),
        stderr: Some(stderr),
    })
}

#[cfg(not(unix))]
fn run_isolated_test(test: &TestCase, _options: &RunOptions) -> Option<Failure> {
    run_in_process(test)
}

#[cfg(unix)]
fn drain(test: &str, stream: &str, bytes: io::Result<Vec<u8>>) -> Vec<u8> {
    bytes.unwrap_or_else(|e| {
        warn!(target: "proba::executor", test, "captured {} unreadable: {}", stream, e);
        Vec::new()
    })
}
