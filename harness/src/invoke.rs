//! Subprocess plumbing shared by the tool adapters.
//!
//! One invocation = one child process with piped stdin/stdout/stderr, a
//! dedicated writer thread (the tool may exit before consuming its input),
//! reader threads for both output streams, and a wall-clock timeout. On
//! timeout the child is killed and reaped — no orphans on any exit path.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Poll interval while waiting for the child to exit.
const WAIT_TICK: Duration = Duration::from_millis(10);

/// One tool invocation.
#[derive(Debug)]
pub struct ToolRequest<'a> {
    pub program: &'a Path,
    pub args: Vec<String>,
    pub stdin: &'a [u8],
    pub timeout: Duration,
}

/// How the invocation ended.
#[derive(Debug)]
pub enum ToolOutcome {
    Completed {
        code: Option<i32>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    TimedOut {
        limit_ms: u64,
    },
}

/// The tool could not be launched at all.
#[derive(Debug, Error)]
#[error("failed to launch `{program}`: {source}")]
pub struct LaunchError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

/// Run one tool invocation to completion or timeout.
///
/// # Errors
///
/// Returns [`LaunchError`] only when the process cannot be spawned;
/// everything after a successful spawn is a [`ToolOutcome`].
pub fn run_tool(request: &ToolRequest<'_>) -> Result<ToolOutcome, LaunchError> {
    let mut child = Command::new(request.program)
        .args(&request.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| LaunchError {
            program: request.program.display().to_string(),
            source,
        })?;

    // Writer thread: a broken pipe just means the tool stopped reading.
    let stdin_bytes = request.stdin.to_vec();
    let writer = child.stdin.take().map(|mut stdin| {
        std::thread::spawn(move || {
            let _ = stdin.write_all(&stdin_bytes);
        })
    });

    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if started.elapsed() >= request.timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                std::thread::sleep(WAIT_TICK);
            }
            Err(error) => {
                tracing::error!(%error, "wait on child process failed");
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };

    if let Some(writer) = writer {
        let _ = writer.join();
    }
    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    match status {
        Some(status) => Ok(ToolOutcome::Completed {
            code: status.code(),
            stdout,
            stderr,
        }),
        None => Ok(ToolOutcome::TimedOut {
            limit_ms: u64::try_from(request.timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<std::thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
