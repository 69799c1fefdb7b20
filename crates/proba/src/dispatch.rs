//! Dispatch - call a test and normalize its return value
//!
//! Every test shape maps onto an exit-code style integer, `0` meaning pass:
//! - `Void`: always `0`
//! - `Int`: the returned value, unchanged
//! - `Bool`: `0` for `true`, `1` for `false`

use crate::test::{TestCase, TestFn};
use std::panic::{self, AssertUnwindSafe};

/// Exit status reported for a test that panicked
pub const PANIC_EXIT_CODE: i32 = 101;

impl TestFn {
    /// Invoke the function and map its result to an exit code
    pub fn call(&self) -> i32 {
        match self {
            TestFn::Void(func) => {
                func();
                0
            }
            TestFn::Int(func) => func(),
            TestFn::Bool(func) => i32::from(!func()),
        }
    }
}

/// Run a test in the current process and return its result code
pub fn run_test(test: &TestCase) -> i32 {
    test.func.call()
}

/// Run a test, turning a panic into [`PANIC_EXIT_CODE`]
///
/// The panic message goes through the installed panic hook (stderr by
/// default).
pub fn run_test_catching(test: &TestCase) -> i32 {
    panic::catch_unwind(AssertUnwindSafe(|| run_test(test))).unwrap_or(PANIC_EXIT_CODE)
}
