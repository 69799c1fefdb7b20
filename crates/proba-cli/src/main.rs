//! proba-demo - a small host exercising the runner end to end

use proba::{register_test, Registry};
use std::process::ExitCode;

fn test_addition() {
    if 1 + 1 != 2 {
        println!("[  FAILED  ] foo test_addition!");
    } else {
        println!("[  PASSED  ] bar test_addition!");
    }
}

fn test_subtraction() {
    if 3 - 2 != 1 {
        println!("[  FAILED  ] foo test_subtraction!");
    } else {
        println!("[  PASSED  ] bar test_subtraction!");
    }
}

fn test_foo() -> bool {
    println!("FOO");
    false
}

fn test_exit_status() -> i32 {
    eprintln!("exit status check");
    0
}

fn test_truth() -> bool {
    true
}

fn registry() -> Registry {
    let mut registry = Registry::new();

    registry.register_suite("default");
    register_test!(registry, test_addition);
    register_test!(registry, test_subtraction);
    register_test!(registry, test_foo);

    registry.register_suite("process");
    register_test!(registry, test_exit_status);
    register_test!(registry, test_truth);

    registry
}

fn main() -> ExitCode {
    proba_cli::main(&registry())
}
