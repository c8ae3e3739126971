//! Privileged Command Runner
//!
//! Runs a shell command under a timeout. When the command fails or times out
//! and the process is not already root, it is retried exactly once under the
//! escalation prefix with the same timeout. A failed run is a normal result
//! for the calling probe to interpret, never an error.

use crate::config::RunnerSettings;
use crate::executor::{Executor, RealExecutor};
use crate::privilege::is_privileged;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeout used by `run` unless the runner was configured otherwise
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Outcome of a runner call. Output is empty whenever `succeeded` is false.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub succeeded: bool,
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
        }
    }

    pub fn failure() -> Self {
        Self::default()
    }

    pub fn trimmed(&self) -> &str {
        self.output.trim()
    }

    /// Non-blank output lines, trimmed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// Command runner with a single privilege-escalation fallback
pub struct CommandRunner {
    executor: Arc<dyn Executor>,
    privileged: bool,
    escalate: bool,
    default_timeout_secs: u64,
}

impl CommandRunner {
    pub fn new(executor: Arc<dyn Executor>, privileged: bool) -> Self {
        Self {
            executor,
            privileged,
            escalate: true,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Runner for the real host, configured from settings
    pub fn from_settings(settings: &RunnerSettings) -> Self {
        let executor = RealExecutor::new(settings.escalation_command.clone());
        Self::new(Arc::new(executor), is_privileged())
            .with_escalation(settings.escalation_enabled())
            .with_default_timeout(settings.effective_default_timeout())
    }

    pub fn with_escalation(mut self, enabled: bool) -> Self {
        self.escalate = enabled;
        self
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Whether a failed command will be retried elevated
    pub fn will_escalate(&self) -> bool {
        self.escalate && !self.privileged
    }

    /// Run with the default timeout
    pub async fn run(&self, command: &str) -> CommandResult {
        self.run_with_timeout(command, self.default_timeout_secs).await
    }

    pub async fn run_with_timeout(&self, command: &str, timeout_secs: u64) -> CommandResult {
        let timeout = Duration::from_secs(timeout_secs.max(1));

        let first = self.executor.execute(command, false, timeout).await;
        if first.status.is_success() {
            return CommandResult::success(first.stdout);
        }
        debug!(command, status = first.status.as_str(), "command failed");

        if !self.will_escalate() {
            return CommandResult::failure();
        }

        debug!(command, "retrying with elevated privileges");
        let second = self.executor.execute(command, true, timeout).await;
        if second.status.is_success() {
            CommandResult::success(second.stdout)
        } else {
            debug!(command, status = second.status.as_str(), "elevated retry failed");
            CommandResult::failure()
        }
    }

    /// `command -v` lookup for an external tool. Never escalates.
    pub async fn has_tool(&self, tool: &str, timeout_secs: u64) -> bool {
        let command = format!("command -v {}", tool);
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let attempt = self.executor.execute(&command, false, timeout).await;
        debug!(tool, status = attempt.status.as_str(), "tool lookup");
        attempt.status.is_success()
    }

    /// Read filesystem-backed state. Never escalates.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.executor.read_file(path.as_ref()).await
    }

    pub async fn list_dir(&self, path: impl AsRef<Path>) -> Option<Vec<PathBuf>> {
        self.executor.list_dir(path.as_ref()).await
    }
}
