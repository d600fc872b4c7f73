//! Subprocess execution for manim, ffmpeg and ffprobe.
//!
//! Output is captured in full, the child is killed when the timeout elapses
//! or the cancellation token fires.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Default wall-clock limit for a single command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("'{program}' was cancelled")]
    Cancelled { program: String },

    #[error("Failed to wait for '{program}': {source}")]
    WaitFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How to run a command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub work_dir: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            work_dir: None,
            envs: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }
}

impl RunOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Last `max_chars` characters of `s`.
pub fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    match s.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// First `max_chars` characters of `s`.
pub fn head(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut r) = reader {
        let _ = r.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub struct CommandRunner;

impl CommandRunner {
    /// Runs `program` with `args` and waits for it, honoring timeout and cancellation.
    ///
    /// A non-zero exit is not an error here; callers inspect `status`.
    pub async fn run(
        program: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<CommandOutput, CommandError> {
        debug!("exec: {} {}", program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &options.work_dir {
            cmd.current_dir(dir);
        }
        for (k, v) in &options.envs {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(|source| CommandError::SpawnFailed {
            program: program.to_string(),
            source,
        })?;

        let stdout_task = tokio::spawn(drain(child.stdout.take()));
        let stderr_task = tokio::spawn(drain(child.stderr.take()));

        let status = tokio::select! {
            _ = options.cancel.cancelled() => {
                warn!("'{}' cancelled, killing process", program);
                let _ = child.kill().await;
                return Err(CommandError::Cancelled { program: program.to_string() });
            }
            _ = tokio::time::sleep(options.timeout) => {
                error!("'{}' timed out after {:?}", program, options.timeout);
                let _ = child.kill().await;
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout: options.timeout,
                });
            }
            status = child.wait() => status.map_err(|source| CommandError::WaitFailed {
                program: program.to_string(),
                source,
            })?,
        };

        Ok(CommandOutput {
            status,
            stdout: stdout_task.await.unwrap_or_default(),
            stderr: stderr_task.await.unwrap_or_default(),
        })
    }
}
