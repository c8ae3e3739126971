//! Executor - the only code that touches the operating system
//!
//! Production code uses `RealExecutor`, which runs shell commands through
//! tokio and reads files directly. Tests use `FakeExecutor` (see `fake`)
//! with scripted responses, so no system calls happen during testing.

use async_trait::async_trait;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Maximum stdout captured per command (journal scans can be long)
const MAX_OUTPUT_BYTES: usize = 4 * 1024 * 1024;

/// Seconds between SIGTERM and SIGKILL for a timed-out elevated command
const ELEVATED_KILL_GRACE_SECS: &str = "1";

/// How a single execution attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// Exited with status 0
    Success,
    /// Exited with a non-zero status (-1 when killed by a signal)
    NonZeroExit(i32),
    /// Did not finish within the timeout and was killed
    Timeout,
    /// Could not be started at all
    SpawnError,
}

impl AttemptStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "success",
            AttemptStatus::NonZeroExit(_) => "non-zero exit",
            AttemptStatus::Timeout => "timeout",
            AttemptStatus::SpawnError => "spawn error",
        }
    }
}

/// Raw result of one execution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub status: AttemptStatus,
    pub stdout: String,
}

impl Attempt {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::Success,
            stdout: stdout.into(),
        }
    }

    pub fn exited(code: i32) -> Self {
        Self {
            status: AttemptStatus::NonZeroExit(code),
            stdout: String::new(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            status: AttemptStatus::Timeout,
            stdout: String::new(),
        }
    }

    pub fn spawn_error() -> Self {
        Self {
            status: AttemptStatus::SpawnError,
            stdout: String::new(),
        }
    }
}

/// Gateway to the host: shell commands and filesystem-backed state
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `command` through `sh -c`, optionally under the escalation prefix.
    /// Stderr is discarded.
    async fn execute(&self, command: &str, elevated: bool, timeout: Duration) -> Attempt;

    /// Read a small state file (sysfs, procfs, /etc)
    async fn read_file(&self, path: &Path) -> Option<String>;

    /// List a directory, sorted by path
    async fn list_dir(&self, path: &Path) -> Option<Vec<PathBuf>>;
}

/// Executor backed by the real system
pub struct RealExecutor {
    escalation_command: Vec<String>,
}

impl RealExecutor {
    pub fn new(escalation_command: Vec<String>) -> Self {
        Self { escalation_command }
    }

    /// Elevated commands carry their own `timeout`, since an unprivileged
    /// parent cannot signal the root-owned children.
    fn build(&self, command: &str, elevated: bool, timeout: Duration) -> Option<Command> {
        let mut cmd = if elevated {
            let (program, prefix) = self.escalation_command.split_first()?;
            let secs = timeout.as_secs().max(1).to_string();
            let mut cmd = Command::new(program);
            cmd.args(prefix)
                .args(["timeout", "-k", ELEVATED_KILL_GRACE_SECS, secs.as_str()])
                .arg("sh")
                .arg("-c")
                .arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .process_group(0);
        Some(cmd)
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new(vec!["sudo".to_string(), "-n".to_string()])
    }
}

#[async_trait]
impl Executor for RealExecutor {
    async fn execute(&self, command: &str, elevated: bool, timeout: Duration) -> Attempt {
        let Some(mut cmd) = self.build(command, elevated, timeout) else {
            return Attempt::spawn_error();
        };

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(command, elevated, "spawn failed: {}", e);
                return Attempt::spawn_error();
            }
        };
        let pid = child.id();

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = truncate_output(&output.stdout);
                if output.status.success() {
                    Attempt::success(stdout)
                } else {
                    Attempt {
                        status: AttemptStatus::NonZeroExit(output.status.code().unwrap_or(-1)),
                        stdout,
                    }
                }
            }
            Ok(Err(e)) => {
                debug!(command, elevated, "wait failed: {}", e);
                Attempt::spawn_error()
            }
            Err(_) => {
                warn!(command, elevated, "timed out after {}s", timeout.as_secs());
                // Pipelines leave grandchildren behind; take the whole group down.
                // The direct child is killed when its handle drops.
                if let Some(pid) = pid {
                    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
                }
                Attempt::timed_out()
            }
        }
    }

    async fn read_file(&self, path: &Path) -> Option<String> {
        tokio::fs::read_to_string(path).await.ok()
    }

    async fn list_dir(&self, path: &Path) -> Option<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await.ok()?;
        let mut paths = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            paths.push(entry.path());
        }
        paths.sort();
        Some(paths)
    }
}

fn truncate_output(bytes: &[u8]) -> String {
    let slice = if bytes.len() > MAX_OUTPUT_BYTES {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };
    String::from_utf8_lossy(slice).into_owned()
}
