//! Golden files - record captured output or compare it against a baseline
//!
//! Golden files are raw byte copies of a test's stdout and stderr, named
//! `<test name><suffix>`. Comparison streams both sides in fixed-size chunks
//! and distinguishes a missing baseline from a content mismatch.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[cfg(unix)]
use crate::isolate::{self, Outcome};
#[cfg(unix)]
use crate::test::TestCase;

/// Chunk size used when comparing streams
pub const CHUNK_SIZE: usize = 4096;

/// Golden store errors
#[derive(Error, Debug)]
pub enum GoldenError {
    #[error("Failed to write golden file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for golden store operations
pub type GoldenResult<T> = Result<T, GoldenError>;

/// Result of comparing live output against a golden file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Identical bytes, identical length
    Match,
    /// Content or length differs
    Mismatch,
    /// The golden file could not be opened
    NotFound,
    /// Reading either side failed midway
    Error,
}

/// File name suffixes for the two golden files of a test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenSuffixes {
    pub stdout: String,
    pub stderr: String,
}

impl Default for GoldenSuffixes {
    fn default() -> Self {
        Self {
            stdout: ".stdout".to_string(),
            stderr: ".stderr".to_string(),
        }
    }
}

/// Paths of the stdout and stderr golden files for a test
///
/// Only the test name is used, so equally named tests in different suites
/// share golden files.
pub fn golden_paths(dir: &Path, test_name: &str, suffixes: &GoldenSuffixes) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{}{}", test_name, suffixes.stdout)),
        dir.join(format!("{}{}", test_name, suffixes.stderr)),
    )
}

/// Drain `stream` into `path`, creating or truncating it
pub fn record(stream: &mut impl Read, path: &Path) -> GoldenResult<u64> {
    let mut file = File::create(path).map_err(|source| GoldenError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let written = io::copy(stream, &mut file).map_err(|source| GoldenError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(target: "proba::golden", path = %path.display(), bytes = written, "recorded");
    Ok(written)
}

/// Compare `stream` against the golden file at `path`
pub fn compare(stream: &mut impl Read, path: &Path) -> Comparison {
    let mut reference = match File::open(path) {
        Ok(file) => file,
        Err(_) => return Comparison::NotFound,
    };
    let result = compare_readers(stream, &mut reference);
    debug!(target: "proba::golden", path = %path.display(), result = ?result, "compared");
    result
}

fn compare_readers(live: &mut impl Read, reference: &mut impl Read) -> Comparison {
    let mut live_buf = [0u8; CHUNK_SIZE];
    let mut ref_buf = [0u8; CHUNK_SIZE];

    loop {
        let live_len = match fill_chunk(live, &mut live_buf) {
            Ok(n) => n,
            Err(_) => return Comparison::Error,
        };
        let ref_len = match fill_chunk(reference, &mut ref_buf[..live_len.max(1)]) {
            Ok(n) => n,
            Err(_) => return Comparison::Error,
        };
        if live_len == 0 {
            // Live output is exhausted; any reference byte left is a mismatch
            return if ref_len == 0 {
                Comparison::Match
            } else {
                Comparison::Mismatch
            };
        }
        if live_len != ref_len || live_buf[..live_len] != ref_buf[..ref_len] {
            return Comparison::Mismatch;
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Outcome of running a test and checking it against its golden files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub exit_code: i32,
    /// `None` when the run failed and no comparison was made
    pub stdout: Option<Comparison>,
    pub stderr: Option<Comparison>,
}

impl CheckReport {
    /// Combined result code
    ///
    /// A non-zero exit code is returned as is. Otherwise each stream adds to
    /// the code: `Match` 0, stdout `Mismatch` +1, stderr `Mismatch` +2,
    /// `NotFound` -3, `Error` -10.
    pub fn code(&self) -> i32 {
        if self.exit_code != 0 {
            return self.exit_code;
        }
        stream_code(self.stdout, 1) + stream_code(self.stderr, 2)
    }

    /// True when the run succeeded and both streams matched
    pub fn matched(&self) -> bool {
        self.exit_code == 0
            && self.stdout == Some(Comparison::Match)
            && self.stderr == Some(Comparison::Match)
    }
}

fn stream_code(comparison: Option<Comparison>, mismatch: i32) -> i32 {
    match comparison {
        Some(Comparison::Match) => 0,
        Some(Comparison::Mismatch) => mismatch,
        Some(Comparison::NotFound) => -3,
        Some(Comparison::Error) | None => -10,
    }
}

/// Compare both captured streams of a finished run
///
/// The streams are consumed and closed before returning.
#[cfg(unix)]
pub fn check_outcome(outcome: Outcome, stdout_ref: &Path, stderr_ref: &Path) -> CheckReport {
    let Outcome {
        exit_code,
        stdout,
        stderr,
        ..
    } = outcome;
    if exit_code != 0 {
        return CheckReport {
            exit_code,
            stdout: None,
            stderr: None,
        };
    }
    CheckReport {
        exit_code,
        stdout: stdout.map(|mut s| compare(&mut s, stdout_ref)),
        stderr: stderr.map(|mut s| compare(&mut s, stderr_ref)),
    }
}

/// Run a test isolated and check its output against golden files
#[cfg(unix)]
pub fn check(test: &TestCase, stdout_ref: &Path, stderr_ref: &Path) -> CheckReport {
    check_outcome(isolate::run_isolated(test), stdout_ref, stderr_ref)
}

/// Run a test isolated and return the combined result code
///
/// See [`CheckReport::code`] for the encoding.
#[cfg(unix)]
pub fn run_checked(test: &TestCase, stdout_ref: &Path, stderr_ref: &Path) -> i32 {
    check(test, stdout_ref, stderr_ref).code()
}

/// [`run_checked`] for a shell command
#[cfg(unix)]
pub fn run_command_checked(command: &str, stdout_ref: &Path, stderr_ref: &Path) -> i32 {
    check_outcome(isolate::run_command_isolated(command), stdout_ref, stderr_ref).code()
}
