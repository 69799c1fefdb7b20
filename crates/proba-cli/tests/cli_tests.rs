//! End-to-end tests of the proba-demo host binary
//!
//! Covers:
//! - Help output
//! - Verbs and selectors
//! - Golden recording and verification
//! - Configuration file and environment overrides

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const ENV_OVERRIDES: [&str; 9] = [
    "PROBA_ISOLATE",
    "PROBA_RECORD",
    "PROBA_TIMER",
    "PROBA_GOLDEN_DIR",
    "PROBA_STDOUT_SUFFIX",
    "PROBA_STDERR_SUFFIX",
    "PROBA_NO_COLOR",
    "PROBA_LOG",
    "NO_COLOR",
];

/// The demo binary, run from `dir` with plain output and a clean environment
fn demo_in(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("proba-demo").unwrap();
    cmd.current_dir(dir);
    for var in ENV_OVERRIDES {
        cmd.env_remove(var);
    }
    cmd.args(["--no-color", "--no-timer"]);
    cmd
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP
// ══════════════════════════════════════════════════════════════════════════════

mod help {
    use super::*;

    #[test]
    fn test_help_shows_verbs_and_examples() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("suite"))
            .stdout(predicate::str::contains("list"))
            .stdout(predicate::str::contains("record"))
            .stdout(predicate::str::contains("verify"))
            .stdout(predicate::str::contains("EXAMPLES"))
            .stdout(predicate::str::contains("PROBA_GOLDEN_DIR"));
    }

    #[test]
    fn test_unknown_flag_is_usage_error() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path()).arg("--bogus").assert().code(2);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// RUNNING
// ══════════════════════════════════════════════════════════════════════════════

mod running {
    use super::*;

    #[test]
    fn test_in_process_run_reports_result_code() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .arg("--no-isolate")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Running all test suites...\n"))
            .stdout(predicate::str::contains("[  Suite  ] suite default, 3 tests\n"))
            .stdout(predicate::str::contains(" => test default::test_addition ... "))
            .stdout(predicate::str::contains("FOO\nFAILED, res: {1}\n"))
            .stdout(predicate::str::contains(
                "[  Suite  ] {default}: All tests completed. Failures: {1}\n",
            ))
            .stdout(predicate::str::contains(
                "\ntest result: FAILED. 2 passed; 1 failed;\n",
            ))
            .stdout(predicate::str::contains("[ SUCCESS ]\n"))
            .stdout(predicate::str::contains("All tests completed. Failures: {1}\n"));
    }

    #[test]
    fn test_suite_verb_runs_one_suite() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .args(["suite", "process", "--no-isolate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[  Suite  ] suite process, 2 tests\n"))
            .stdout(predicate::str::contains("suite default").not());
    }

    #[test]
    fn test_test_verb_runs_one_test() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .args(["test", "default::test_addition", "--no-isolate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[  Suite  ] suite default, 1 tests\n"))
            .stdout(predicate::str::contains("test_foo").not());
    }

    #[test]
    fn test_unknown_suite_exits_two() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .args(["suite", "nope"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("nothing to run for 'nope'"));
    }

    #[test]
    fn test_unknown_test_exits_two() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .args(["test", "default::missing"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("default::missing"));
    }

    #[test]
    fn test_test_verb_needs_suite_prefix() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .args(["test", "test_foo"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("expected SUITE::TEST"));
    }

    #[test]
    fn test_list() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .arg("list")
            .assert()
            .success()
            .stdout(
                "default::test_addition\n\
                 default::test_subtraction\n\
                 default::test_foo\n\
                 process::test_exit_status\n\
                 process::test_truth\n",
            );
    }

    #[cfg(unix)]
    #[test]
    fn test_isolated_run_reprints_failure_output() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .assert()
            .code(1)
            .stdout(predicate::str::contains(" => test default::test_foo ... FAILED\n"))
            .stdout(predicate::str::contains(
                "---- default::test_foo stdout ----\nFOO\n---- default::test_foo stderr ----\n",
            ))
            .stdout(predicate::str::contains(
                "    default::test_foo: exit code {1}\n",
            ));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// GOLDEN FILES
// ══════════════════════════════════════════════════════════════════════════════

#[cfg(unix)]
mod golden {
    use super::*;

    #[test]
    fn test_record_then_verify() {
        let dir = TempDir::new().unwrap();

        demo_in(dir.path()).arg("record").assert().code(1);

        assert_eq!(
            fs::read_to_string(dir.path().join("test_addition.stdout")).unwrap(),
            "[  PASSED  ] bar test_addition!\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("test_exit_status.stderr")).unwrap(),
            "exit status check\n"
        );
        assert!(!dir.path().join("test_foo.stdout").exists());

        demo_in(dir.path())
            .args(["verify", "default::test_addition"])
            .assert()
            .success();

        fs::write(dir.path().join("test_addition.stdout"), "changed\n").unwrap();
        demo_in(dir.path())
            .args(["verify", "default::test_addition"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(
                "    default::test_addition: exit code {1}\n",
            ));
    }

    #[test]
    fn test_verify_without_golden_files_fails() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .args(["verify", "process"])
            .assert()
            .code(2)
            .stdout(predicate::str::contains(
                "    process::test_truth: exit code {-6}\n",
            ));
    }

    #[test]
    fn test_golden_dir_flag() {
        let dir = TempDir::new().unwrap();
        let golden = dir.path().join("golden");
        fs::create_dir(&golden).unwrap();

        demo_in(dir.path())
            .args(["record", "process", "--golden-dir", "golden"])
            .assert()
            .success();

        assert!(golden.join("test_truth.stdout").exists());
        assert!(!dir.path().join("test_truth.stdout").exists());
    }

    #[test]
    fn test_suffix_env_override() {
        let dir = TempDir::new().unwrap();

        demo_in(dir.path())
            .args(["record", "process::test_exit_status"])
            .env("PROBA_STDOUT_SUFFIX", ".out")
            .env("PROBA_STDERR_SUFFIX", ".err")
            .assert()
            .success();

        assert_eq!(
            fs::read_to_string(dir.path().join("test_exit_status.err")).unwrap(),
            "exit status check\n"
        );
        assert!(dir.path().join("test_exit_status.out").exists());
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ══════════════════════════════════════════════════════════════════════════════

mod configuration {
    use super::*;

    #[test]
    fn test_project_file_disables_isolation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("proba.toml"), "[run]\nisolate = false\n").unwrap();

        demo_in(dir.path())
            .assert()
            .code(1)
            .stdout(predicate::str::contains("FAILED, res: {1}"));
    }

    #[test]
    fn test_isolate_env_disables_isolation() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .env("PROBA_ISOLATE", "0")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("FAILED, res: {1}"));
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.toml");
        fs::write(&config, "[run]\nisolate = false\n").unwrap();

        demo_in(dir.path())
            .arg("--config")
            .arg(&config)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("FAILED, res: {1}"));
    }

    #[test]
    fn test_invalid_config_exits_two() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("proba.toml"), "[run]\nparallel = true\n").unwrap();

        demo_in(dir.path())
            .assert()
            .code(2)
            .stderr(predicate::str::contains("error:"))
            .stderr(predicate::str::contains("proba.toml"));
    }

    #[test]
    fn test_missing_config_file_exits_two() {
        let dir = TempDir::new().unwrap();
        demo_in(dir.path())
            .args(["--config", "absent.toml"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("absent.toml"));
    }
}
