//! Snippet execution against the external interpreter.
//!
//! Each execution writes the (remediated) code to a uniquely-named temp
//! file, invokes the interpreter as a subprocess with that file as its
//! final argument, and waits under a wall-clock timeout. The temp file is
//! owned by a [`tempfile::NamedTempFile`], so it is removed on every exit
//! path. Executions share nothing mutable, which makes them safe to run
//! from a worker pool without coordination.
//!
//! Failures to launch the interpreter (missing binary, permission error)
//! become failed outcomes with a distinguished infrastructure status; they
//! never abort the run and are never retried. Timeouts kill the subprocess
//! and are likewise terminal for that snippet only.

use crate::config::RunSettings;
use crate::error::{Result, VetError};
use crate::pipeline::CancelToken;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Stderr text recorded for executions that exceeded the timeout. The
/// classifier's highest-priority predicate matches on this.
pub const TIMEOUT_SENTINEL: &str = "execution timed out";

/// Poll interval while waiting on a child process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// The interpreter exited with this code. Termination by signal is
    /// recorded as -1.
    Code(i32),
    /// The execution exceeded the timeout and was killed.
    Timeout,
    /// The interpreter could not be launched at all.
    Infra,
}

/// Captured result of one interpreter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// True exactly when the interpreter exited with code 0.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured diagnostics; the timeout sentinel for timed-out runs, the
    /// launch error text for infrastructure failures.
    pub stderr: String,
    /// Exit disposition.
    pub status: ExitStatus,
    /// Wall-clock duration of the attempt.
    pub duration: Duration,
}

impl Outcome {
    fn infra(error: String, start: Instant) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: error,
            status: ExitStatus::Infra,
            duration: start.elapsed(),
        }
    }
}

/// Runs snippets against a fixed interpreter command in a fixed working
/// directory. Read-only after construction; shareable across workers.
pub struct Runner {
    /// Interpreter program plus leading arguments; the snippet file path is
    /// appended per invocation.
    command: Vec<String>,
    workdir: PathBuf,
    timeout: Duration,
    /// Suffix for snippet temp files, e.g. ".myco".
    suffix: String,
    temp_dir: PathBuf,
}

impl Runner {
    /// Build a runner from validated run settings.
    pub fn from_settings(settings: &RunSettings) -> Result<Self> {
        let mut command = shell_words::split(&settings.interpreter).map_err(|e| {
            VetError::UserError(format!(
                "failed to parse interpreter command '{}': {}",
                settings.interpreter, e
            ))
        })?;
        if command.is_empty() {
            return Err(VetError::UserError(
                "interpreter command is empty".to_string(),
            ));
        }

        // Subprocesses run in the workdir; spawn the absolute path so a
        // program given relative to the invoking directory still resolves.
        if let Some(resolved) = crate::config::resolve_program(&command[0]) {
            command[0] = resolved.to_string_lossy().into_owned();
        }

        Ok(Self {
            command,
            workdir: settings.workdir.clone(),
            timeout: settings.timeout,
            suffix: format!(".{}", settings.config.language),
            temp_dir: std::env::temp_dir(),
        })
    }

    /// Override where snippet temp files are created.
    #[cfg(test)]
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Execute one snippet.
    ///
    /// Returns `None` only when the cancel token tripped while waiting, in
    /// which case the child was killed best-effort and no outcome is
    /// recorded. Every other path, including timeouts and launch failures,
    /// produces an outcome. The temp file is removed on all paths.
    pub fn execute(&self, code: &str, cancel: &CancelToken) -> Option<Outcome> {
        let start = Instant::now();

        // Scoped acquisition: dropping the handle deletes the file.
        let file = match self.write_snippet(code) {
            Ok(file) => file,
            Err(e) => return Some(Outcome::infra(e, start)),
        };

        let mut child = match Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg(file.path())
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return Some(Outcome::infra(
                    format!("failed to launch interpreter '{}': {}", self.command[0], e),
                    start,
                ));
            }
        };

        // Drain pipes on capture threads so a chatty child cannot deadlock
        // against a full pipe buffer while we poll.
        let stdout_reader = spawn_capture(child.stdout.take());
        let stderr_reader = spawn_capture(child.stderr.take());

        let waited = wait_with_timeout(&mut child, self.timeout, cancel);
        let duration = start.elapsed();

        match waited {
            Wait::Exited(code) => Some(Outcome {
                success: code == Some(0),
                stdout: join_capture(stdout_reader),
                stderr: join_capture(stderr_reader),
                status: ExitStatus::Code(code.unwrap_or(-1)),
                duration,
            }),
            Wait::TimedOut => {
                // The child is dead, but a process it forked may still hold
                // the pipe write ends; joining would block for that
                // grandchild's lifetime. Take whatever finished capturing
                // and detach the rest.
                let stdout = harvest_finished(stdout_reader);
                drop(stderr_reader);
                Some(Outcome {
                    success: false,
                    stdout,
                    stderr: TIMEOUT_SENTINEL.to_string(),
                    status: ExitStatus::Timeout,
                    duration,
                })
            }
            Wait::Cancelled => {
                drop(stdout_reader);
                drop(stderr_reader);
                None
            }
        }
    }

    fn write_snippet(&self, code: &str) -> std::result::Result<tempfile::NamedTempFile, String> {
        let mut file = tempfile::Builder::new()
            .prefix("mycovet-")
            .suffix(&self.suffix)
            .tempfile_in(&self.temp_dir)
            .map_err(|e| format!("failed to create snippet temp file: {}", e))?;

        file.write_all(code.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| format!("failed to write snippet temp file: {}", e))?;

        Ok(file)
    }
}

enum Wait {
    Exited(Option<i32>),
    TimedOut,
    Cancelled,
}

/// Poll a child process until it exits, the timeout expires, or the run is
/// cancelled. Timeout and cancellation both kill the child and reap it.
fn wait_with_timeout(child: &mut Child, timeout: Duration, cancel: &CancelToken) -> Wait {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Wait::Exited(status.code()),
            Ok(None) => {
                if cancel.is_cancelled() {
                    kill_child(child);
                    return Wait::Cancelled;
                }
                if start.elapsed() >= timeout {
                    kill_child(child);
                    return Wait::TimedOut;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(_) => {
                // Treat an unreadable status like an exit we could not
                // observe; reap best-effort.
                kill_child(child);
                return Wait::Exited(None);
            }
        }
    }
}

/// Kill a child and wait for it so it does not linger as a zombie.
fn kill_child(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_capture<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> Option<std::thread::JoinHandle<String>> {
    let mut pipe = pipe?;
    Some(std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }))
}

fn join_capture(handle: Option<std::thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Take a capture thread's output only if it has already finished; a still
/// blocked reader is detached rather than joined.
fn harvest_finished(handle: Option<std::thread::JoinHandle<String>>) -> String {
    match handle {
        Some(h) if h.is_finished() => h.join().unwrap_or_default(),
        _ => String::new(),
    }
}
