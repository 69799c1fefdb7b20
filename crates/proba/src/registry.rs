//! Suites and registries - ordered, bounded containers of tests
//!
//! Registration always targets the most recently added suite. Both
//! containers have a fixed capacity; registering past it drops the entry
//! with a warning instead of failing the whole registration phase.

use crate::test::{TestCase, TestReturn};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Default number of tests a suite accepts
pub const MAX_TESTS: usize = 100;

/// Default number of suites a registry accepts
pub const MAX_SUITES: usize = 100;

/// Name of the suite opened implicitly when a test is registered first
pub const DEFAULT_SUITE: &str = "default";

/// Registration and lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("can't accept {{{test}}}, suite {{{suite}}} is full")]
    SuiteFull {
        suite: &'static str,
        test: &'static str,
    },

    #[error("can't accept suite {{{suite}}}, registry is full")]
    RegistryFull { suite: &'static str },

    #[error("no suite named '{0}'")]
    SuiteNotFound(String),

    #[error("no test named '{test}' in suite '{suite}'")]
    TestNotFound { suite: String, test: String },
}

/// An ordered group of tests under a name
#[derive(Debug, Clone)]
pub struct Suite {
    name: &'static str,
    tests: Vec<TestCase>,
    capacity: usize,
}

impl Suite {
    /// Create an empty suite with the default capacity
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, MAX_TESTS)
    }

    /// Create an empty suite holding at most `capacity` tests
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            tests: Vec::new(),
            capacity,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tests in registration order
    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tests.len() >= self.capacity
    }

    /// Look up a test by name
    pub fn test(&self, name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// Append a test, failing if the suite is full
    pub fn try_push(&mut self, test: TestCase) -> Result<(), RegistryError> {
        if self.is_full() {
            return Err(RegistryError::SuiteFull {
                suite: self.name,
                test: test.name,
            });
        }
        self.tests.push(test);
        Ok(())
    }
}

/// The root container: an ordered group of suites
#[derive(Debug, Clone)]
pub struct Registry {
    suites: Vec<Suite>,
    capacity: usize,
    tests_per_suite: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with the default capacities
    pub fn new() -> Self {
        Self::with_capacity(MAX_SUITES, MAX_TESTS)
    }

    /// Create an empty registry with explicit suite and per-suite test limits
    pub fn with_capacity(suites: usize, tests_per_suite: usize) -> Self {
        Self {
            suites: Vec::new(),
            capacity: suites,
            tests_per_suite,
        }
    }

    /// Suites in registration order
    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Total number of tests across all suites
    pub fn test_count(&self) -> usize {
        self.suites.iter().map(Suite::len).sum()
    }

    /// The suite new tests are registered into
    pub fn current_suite(&self) -> Option<&Suite> {
        self.suites.last()
    }

    /// Open a new suite; later registrations go into it
    pub fn try_register_suite(&mut self, name: &'static str) -> Result<(), RegistryError> {
        if self.suites.len() >= self.capacity {
            return Err(RegistryError::RegistryFull { suite: name });
        }
        self.suites
            .push(Suite::with_capacity(name, self.tests_per_suite));
        Ok(())
    }

    /// Open a new suite, dropping it with a warning if the registry is full
    pub fn register_suite(&mut self, name: &'static str) {
        if let Err(e) = self.try_register_suite(name) {
            warn!(target: "proba::registry", "register_suite(): {}", e);
        }
    }

    /// Add a test case to the current suite
    ///
    /// If no suite has been opened yet, the `"default"` suite is opened first.
    pub fn try_register_case(&mut self, test: TestCase) -> Result<(), RegistryError> {
        if self.suites.is_empty() {
            self.try_register_suite(DEFAULT_SUITE)?;
        }
        match self.suites.last_mut() {
            Some(suite) => suite.try_push(test),
            None => Err(RegistryError::RegistryFull {
                suite: DEFAULT_SUITE,
            }),
        }
    }

    /// Add a test function to the current suite, failing if it is full
    pub fn try_register<R: TestReturn>(
        &mut self,
        name: &'static str,
        func: fn() -> R,
    ) -> Result<(), RegistryError> {
        self.try_register_case(TestCase::new(name, func))
    }

    /// Add a test function to the current suite
    ///
    /// A full suite drops the test with a warning; registration of later
    /// tests and suites is unaffected.
    pub fn register<R: TestReturn>(&mut self, name: &'static str, func: fn() -> R) {
        if let Err(e) = self.try_register(name, func) {
            warn!(target: "proba::registry", "register_test(): {}", e);
        }
    }

    /// Look up a suite by name (first match in registration order)
    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.suites.iter().find(|s| s.name == name)
    }

    /// Look up a single test
    pub fn find_test(&self, suite: &str, test: &str) -> Result<(&Suite, &TestCase), RegistryError> {
        let found = self
            .suite(suite)
            .ok_or_else(|| RegistryError::SuiteNotFound(suite.to_string()))?;
        let case = found.test(test).ok_or_else(|| RegistryError::TestNotFound {
            suite: suite.to_string(),
            test: test.to_string(),
        })?;
        Ok((found, case))
    }

    /// Resolve a selector into the registry it names
    ///
    /// The result is a registry holding copies of the selected suites (or a
    /// single suite with a single test), so it can be run like any other.
    pub fn select(&self, selector: &Selector) -> Result<Registry, RegistryError> {
        match selector {
            Selector::All => Ok(self.clone()),
            Selector::Suite(name) => {
                let suite = self
                    .suite(name)
                    .ok_or_else(|| RegistryError::SuiteNotFound(name.clone()))?;
                Ok(self.with_suites(vec![suite.clone()]))
            }
            Selector::Test { suite, test } => {
                let (found, case) = self.find_test(suite, test)?;
                let mut single = Suite::with_capacity(found.name, found.capacity);
                single.tests.push(*case);
                Ok(self.with_suites(vec![single]))
            }
        }
    }

    fn with_suites(&self, suites: Vec<Suite>) -> Registry {
        Registry {
            suites,
            capacity: self.capacity,
            tests_per_suite: self.tests_per_suite,
        }
    }
}

/// Which part of a registry to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    All,
    Suite(String),
    Test { suite: String, test: String },
}

impl Selector {
    /// Parse `""`/`"all"`, `"SUITE"` or `"SUITE::TEST"`
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || input == "all" {
            return Selector::All;
        }
        match input.split_once("::") {
            Some((suite, test)) => Selector::Test {
                suite: suite.to_string(),
                test: test.to_string(),
            },
            None => Selector::Suite(input.to_string()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => write!(f, "all"),
            Selector::Suite(name) => write!(f, "{}", name),
            Selector::Test { suite, test } => write!(f, "{}::{}", suite, test),
        }
    }
}
