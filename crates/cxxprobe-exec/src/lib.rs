//! External process execution seam shared by harness tooling.
//!
//! Every process the probe launches (version query, compile, execute, library
//! identity) goes through [`CommandRunner::run`]. The harness never touches
//! `std::process` directly, so tests can substitute a scripted runner while
//! preserving exact orchestration semantics.

#![forbid(unsafe_code)]

use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a timed child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extra time granted to read output that was already written when the child
/// exited right at its deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{program}' did not finish within {}ms and was killed", .timeout.as_millis())]
    TimedOut { program: String, timeout: Duration },
}

/// Captured result of one finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Build an output for a process that exited normally.
    #[must_use]
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable description of how the process ended.
    #[must_use]
    pub fn status_description(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => String::from("terminated by signal"),
        }
    }

    fn from_parts(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }
}

/// Narrow "run external command, capture output and exit code" primitive.
pub trait CommandRunner {
    /// Run `program` with `args`, wait for it, and capture its output.
    ///
    /// A non-zero exit is not an error; only failing to launch or wait for
    /// the process is.
    fn run(&mut self, program: &Path, args: &[OsString]) -> Result<ProcessOutput, ExecError>;
}

/// Runs commands as real child processes, one at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Create a runner. `None` waits for children indefinitely.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, program: &Path, args: &[OsString]) -> Result<ProcessOutput, ExecError> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());

        // A timeout too large to represent as a deadline is the same as none.
        let deadline = self
            .timeout
            .and_then(|timeout| Some((timeout, Instant::now().checked_add(timeout)?)));
        let Some((timeout, deadline)) = deadline else {
            let output = command.output().map_err(|source| spawn_error(program, source))?;
            return Ok(ProcessOutput::from_parts(
                output.status,
                &output.stdout,
                &output.stderr,
            ));
        };

        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command
            .spawn()
            .map_err(|source| spawn_error(program, source))?;
        run_with_deadline(&mut child, program, timeout, deadline)
    }
}

fn spawn_error(program: &Path, source: std::io::Error) -> ExecError {
    ExecError::Spawn {
        program: program.display().to_string(),
        source,
    }
}

fn run_with_deadline(
    child: &mut Child,
    program: &Path,
    timeout: Duration,
    deadline: Instant,
) -> Result<ProcessOutput, ExecError> {
    // Pipes are drained off-thread so a chatty child cannot block on a full pipe
    // while we poll.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            // Reader threads are left detached: grandchildren may still hold the pipes.
            return Err(ExecError::TimedOut {
                program: program.display().to_string(),
                timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    // Background grandchildren may keep the pipes open after the child exits;
    // whatever arrived by the deadline is the output.
    let read_until = deadline.max(Instant::now() + DRAIN_GRACE);
    Ok(ProcessOutput::from_parts(
        status,
        &collect(stdout, read_until),
        &collect(stderr, read_until),
    ))
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

fn collect(chunks: Option<Receiver<Vec<u8>>>, until: Instant) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(chunks) = chunks else {
        return buf;
    };
    // Ends on disconnect (pipe closed) or once `until` has passed.
    while let Ok(chunk) = chunks.recv_timeout(until.saturating_duration_since(Instant::now())) {
        buf.extend_from_slice(&chunk);
    }
    buf
}
