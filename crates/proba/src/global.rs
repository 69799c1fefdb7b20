//! The process-wide default registry
//!
//! Lifecycle: empty until [`populate`] runs its registration closure once,
//! read-only afterwards, reclaimed at process exit. Callers that want no
//! global state can build a [`Registry`] and pass it around instead.

use crate::executor::{self, RunOptions};
use crate::registry::Registry;
use std::io;
use std::sync::OnceLock;
use tracing::warn;

static DEFAULT_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Fill the default registry
///
/// Only the first call runs `register`; later calls return the registry
/// that is already in place and warn that their closure was discarded. A
/// [`default_registry`] call before `populate` freezes an empty registry.
pub fn populate(register: impl FnOnce(&mut Registry)) -> &'static Registry {
    let mut ran = false;
    let registry = DEFAULT_REGISTRY.get_or_init(|| {
        ran = true;
        let mut registry = Registry::new();
        register(&mut registry);
        registry
    });
    if !ran {
        warn!(
            target: "proba::global",
            tests = registry.test_count(),
            "default registry is already frozen, registrations discarded"
        );
    }
    registry
}

/// The default registry; empty if it was never populated
pub fn default_registry() -> &'static Registry {
    DEFAULT_REGISTRY.get_or_init(Registry::new)
}

/// Whether [`populate`] (or [`default_registry`]) has frozen the registry
pub fn is_populated() -> bool {
    DEFAULT_REGISTRY.get().is_some()
}

/// Run every suite of the default registry and return the failure count
pub fn run_tests(isolate: bool) -> io::Result<usize> {
    let options = RunOptions::default().with_isolate(isolate);
    let mut reporter = options.reporter();
    executor::run_registry_with(default_registry(), &options, &mut reporter)
        .map(|summary| summary.failed())
}
