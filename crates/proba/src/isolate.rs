//! Isolated runs - execute a test in a child process and capture its output
//!
//! The child's stdout and stderr descriptors are pointed at two anonymous
//! temporary files. The parent blocks until the child terminates, then hands
//! both files back inside an [`Outcome`], rewound to the start.
//!
//! Failing to allocate the temporary files or to create the child is fatal:
//! the process exits with status 1. Failing to observe the child's
//! termination is not; it yields [`Outcome::monitoring_failure`].

use crate::dispatch;
use crate::test::TestCase;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};
use tracing::{debug, error, warn};

/// Exit code used when no exit status is available
pub const NO_EXIT_CODE: i32 = -1;

/// Exit status of a child that could not redirect its output
const REDIRECT_FAILED: i32 = 127;

/// Output captured from an isolated run
///
/// Backed by an anonymous temporary file that is deleted when the stream is
/// dropped. Reading consumes it; call [`CapturedStream::rewind`] to read
/// again from the start.
#[derive(Debug)]
pub struct CapturedStream {
    file: File,
}

impl CapturedStream {
    fn allocate() -> io::Result<Self> {
        Ok(Self {
            file: tempfile::tempfile()?,
        })
    }

    /// Move back to the first captured byte
    pub fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Read everything from the current position, then rewind
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.file.read_to_end(&mut bytes)?;
        self.rewind()?;
        Ok(bytes)
    }

    /// Give up the stream and keep the underlying file
    pub fn into_file(self) -> File {
        self.file
    }
}

impl Read for CapturedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for CapturedStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

/// Result of an isolated run
///
/// The caller owns both streams; they are closed when the outcome (or the
/// stream taken out of it) is dropped.
#[derive(Debug)]
pub struct Outcome {
    /// Exit status, or [`NO_EXIT_CODE`] if the child was killed by a signal
    /// or could not be observed
    pub exit_code: i32,
    /// Signal that terminated the child, if any
    pub signal: Option<i32>,
    pub stdout: Option<CapturedStream>,
    pub stderr: Option<CapturedStream>,
}

impl Outcome {
    /// The outcome returned when waiting on the child failed
    pub fn monitoring_failure() -> Self {
        Self {
            exit_code: NO_EXIT_CODE,
            signal: None,
            stdout: None,
            stderr: None,
        }
    }

    /// True if this is the outcome of a failed wait
    pub fn is_monitoring_failure(&self) -> bool {
        self.exit_code == NO_EXIT_CODE
            && self.signal.is_none()
            && self.stdout.is_none()
            && self.stderr.is_none()
    }

    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    pub fn failed(&self) -> bool {
        !self.passed()
    }

    /// Drain captured stdout; empty if there is none
    pub fn read_stdout(&mut self) -> io::Result<Vec<u8>> {
        read_optional(self.stdout.as_mut())
    }

    /// Drain captured stderr; empty if there is none
    pub fn read_stderr(&mut self) -> io::Result<Vec<u8>> {
        read_optional(self.stderr.as_mut())
    }
}

fn read_optional(stream: Option<&mut CapturedStream>) -> io::Result<Vec<u8>> {
    match stream {
        Some(stream) => stream.read_all(),
        None => Ok(Vec::new()),
    }
}

/// Run a test in a forked child process
///
/// The child redirects stdout/stderr onto fresh temporary files, dispatches
/// the test, flushes both streams and exits with the test's result code.
/// A panic inside the test exits with [`dispatch::PANIC_EXIT_CODE`].
///
/// Only the low byte of the result survives as exit status; results whose
/// low byte is zero but which are non-zero are reported as 1.
///
/// Fork safety: the child is a copy of one thread. If another thread of the
/// host holds a lock the test needs (the stdout lock, the allocator) at the
/// moment of the fork, the child blocks on it and the parent waits forever.
/// Call this from single-threaded hosts, or keep other threads quiet while
/// tests run.
pub fn run_isolated(test: &TestCase) -> Outcome {
    let (stdout, stderr) = allocate_streams();
    flush_console();

    // SAFETY: the child only redirects descriptors, runs the test and calls
    // `_exit`; it never returns into the caller's frames.
    let pid = unsafe { libc::fork() };
    if pid == -1 {
        fatal("fork", io::Error::last_os_error());
    }
    if pid == 0 {
        run_child(test, &stdout, &stderr);
    }

    debug!(target: "proba::isolate", test = test.name, pid, "waiting for child");
    match wait_pid(pid) {
        Ok(status) => {
            let exit_code = if libc::WIFEXITED(status) {
                Some(libc::WEXITSTATUS(status))
            } else {
                None
            };
            let signal = if libc::WIFSIGNALED(status) {
                Some(libc::WTERMSIG(status))
            } else {
                None
            };
            finish(test.name, exit_code, signal, stdout, stderr)
        }
        Err(e) => {
            error!(target: "proba::isolate", test = test.name, "waitpid() failed: {}", e);
            Outcome::monitoring_failure()
        }
    }
}

/// Run a shell command with its output captured like an isolated test
///
/// The command runs under `sh -c`; its stdin is inherited.
pub fn run_command_isolated(command: &str) -> Outcome {
    let (stdout, stderr) = allocate_streams();
    let child_out = stdout
        .file
        .try_clone()
        .unwrap_or_else(|e| fatal("dup", e));
    let child_err = stderr
        .file
        .try_clone()
        .unwrap_or_else(|e| fatal("dup", e));
    flush_console();

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::from(child_out))
        .stderr(Stdio::from(child_err))
        .spawn()
        .unwrap_or_else(|e| fatal("spawn", e));

    debug!(target: "proba::isolate", command, pid = child.id(), "waiting for command");
    match child.wait() {
        Ok(status) => finish(command, status.code(), status.signal(), stdout, stderr),
        Err(e) => {
            error!(target: "proba::isolate", command, "wait() failed: {}", e);
            Outcome::monitoring_failure()
        }
    }
}

fn allocate_streams() -> (CapturedStream, CapturedStream) {
    let stdout = CapturedStream::allocate().unwrap_or_else(|e| fatal("tmpfile", e));
    let stderr = CapturedStream::allocate().unwrap_or_else(|e| fatal("tmpfile", e));
    (stdout, stderr)
}

/// Buffered console output must not be duplicated into the child.
fn flush_console() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

fn run_child(test: &TestCase, stdout: &CapturedStream, stderr: &CapturedStream) -> ! {
    let code = match redirect(stdout, libc::STDOUT_FILENO)
        .and_then(|_| redirect(stderr, libc::STDERR_FILENO))
    {
        Ok(()) => {
            let code = dispatch::run_test_catching(test);
            let _ = io::stdout().flush();
            let _ = io::stderr().flush();
            code
        }
        Err(_) => REDIRECT_FAILED,
    };
    // SAFETY: terminates the forked child without unwinding into the parent's
    // frames or running its exit handlers.
    unsafe { libc::_exit(exit_status(code)) }
}

/// Exit status for a result code
///
/// Only the low byte of a status reaches the parent. A non-zero result whose
/// low byte is zero (256, 512, ...) exits with 1 so it still fails.
fn exit_status(code: i32) -> i32 {
    if code != 0 && code & 0xff == 0 {
        1
    } else {
        code
    }
}

fn redirect(stream: &CapturedStream, target: libc::c_int) -> io::Result<()> {
    // SAFETY: both descriptors are open for the duration of the call.
    if unsafe { libc::dup2(stream.file.as_raw_fd(), target) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn wait_pid(pid: libc::pid_t) -> io::Result<libc::c_int> {
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: `status` is a valid out-pointer for the call.
        if unsafe { libc::waitpid(pid, &mut status, 0) } != -1 {
            return Ok(status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn finish(
    label: &str,
    exit_code: Option<i32>,
    signal: Option<i32>,
    stdout: CapturedStream,
    stderr: CapturedStream,
) -> Outcome {
    if let Some(signal) = signal {
        warn!(target: "proba::isolate", "{}: process was terminated by signal {}", label, signal);
    }
    Outcome {
        exit_code: exit_code.unwrap_or(NO_EXIT_CODE),
        signal,
        stdout: rewound(label, stdout),
        stderr: rewound(label, stderr),
    }
}

fn rewound(label: &str, mut stream: CapturedStream) -> Option<CapturedStream> {
    match stream.rewind() {
        Ok(()) => Some(stream),
        Err(e) => {
            warn!(target: "proba::isolate", "{}: captured output lost: {}", label, e);
            None
        }
    }
}

fn fatal(what: &str, err: io::Error) -> ! {
    error!(target: "proba::isolate", "{}: {}", what, err);
    eprintln!("{}: {}", what, err);
    std::process::exit(1)
}
