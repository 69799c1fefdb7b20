//! Verb implementations

use anyhow::{Context, Result};
use proba::{Registry, RunOptions};
use std::io::{self, Write};
use tracing::debug;

/// Run a registry with the console reporter
pub fn execute(registry: &Registry, options: &RunOptions) -> Result<usize> {
    debug!(
        suites = registry.suites().len(),
        tests = registry.test_count(),
        isolate = options.isolate,
        golden = ?options.golden,
        "starting run"
    );
    let mut reporter = options.reporter();
    let summary = proba::run_registry_with(registry, options, &mut reporter)
        .context("failed to write test report")?;
    Ok(summary.failed())
}

/// Print `SUITE::TEST` for every registered test
pub fn list(registry: &Registry) -> Result<()> {
    let stdout = io::stdout();
    write_list(registry, &mut stdout.lock()).context("failed to write test list")
}

fn write_list(registry: &Registry, out: &mut impl Write) -> io::Result<()> {
    for suite in registry.suites() {
        for test in suite.tests() {
            writeln!(out, "{}::{}", suite.name(), test.name)?;
        }
    }
    out.flush()
}
