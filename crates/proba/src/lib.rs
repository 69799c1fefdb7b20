//! Proba - a minimal test-execution engine
//!
//! Register test functions into suites, suites into a registry, then run
//! them in-process or each in its own child process. Isolated runs capture
//! stdout/stderr, exit status and terminating signal, and their output can
//! be recorded as golden files or verified against them.
//!
//! # Example
//!
//! ```no_run
//! use proba::{register_test, Registry, RunOptions};
//!
//! fn test_addition() -> bool {
//!     1 + 1 == 2
//! }
//!
//! fn test_exit_code() -> i32 {
//!     0
//! }
//!
//! let mut registry = Registry::new();
//! registry.register_suite("default");
//! register_test!(registry, test_addition);
//! register_test!(registry, test_exit_code);
//!
//! let options = RunOptions::default();
//! let mut reporter = options.reporter();
//! let summary = proba::run_registry_with(&registry, &options, &mut reporter).unwrap();
//! std::process::exit(summary.failed() as i32);
//! ```

pub mod dispatch;
pub mod executor;
pub mod global;
pub mod golden;
#[cfg(unix)]
pub mod isolate;
pub mod registry;
pub mod report;

pub use dispatch::{run_test, run_test_catching, PANIC_EXIT_CODE};
pub use executor::{
    run_registry, run_registry_with, run_suite, run_suite_with, GoldenMode, RunOptions,
    RunSummary, SuiteReport, ISOLATION_AVAILABLE,
};
pub use global::{default_registry, populate, run_tests};
pub use golden::{compare, golden_paths, record, CheckReport, Comparison, GoldenError, GoldenSuffixes};
#[cfg(unix)]
pub use golden::{check, run_checked, run_command_checked};
#[cfg(unix)]
pub use isolate::{run_command_isolated, run_isolated, CapturedStream, Outcome};
pub use registry::{Registry, RegistryError, Selector, Suite, MAX_SUITES, MAX_TESTS};
pub use report::{Failure, Reporter};
pub use test::{TestCase, TestFn, TestKind, TestReturn};
