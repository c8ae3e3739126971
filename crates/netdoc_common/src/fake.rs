//! Fake executor for deterministic testing
//!
//! Responses are scripted per command pattern: the first registered pattern
//! contained in the executed command wins. Unscripted commands behave like a
//! missing tool (exit 127). Every call is recorded for assertions.
//!
//! ```rust,ignore
//! let fake = Arc::new(
//!     FakeExecutor::new()
//!         .ok("systemctl show systemd-networkd", "ActiveState=active\n")
//!         .elevated_only("journalctl", "")
//!         .file("/sys/class/net/eth0/carrier", "1\n"),
//! );
//! let runner = CommandRunner::new(fake.clone(), false);
//! ```

use crate::executor::{Attempt, Executor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A recorded execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub command: String,
    pub elevated: bool,
}

#[derive(Debug, Clone)]
struct Script {
    pattern: String,
    plain: Attempt,
    elevated: Attempt,
}

/// Scripted executor
#[derive(Debug, Default)]
pub struct FakeExecutor {
    scripts: Vec<Script>,
    files: HashMap<PathBuf, String>,
    dirs: HashMap<PathBuf, Vec<PathBuf>>,
    calls: Arc<Mutex<Vec<FakeCall>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script both the plain and the elevated attempt
    pub fn respond(mut self, pattern: &str, plain: Attempt, elevated: Attempt) -> Self {
        self.scripts.push(Script {
            pattern: pattern.to_string(),
            plain,
            elevated,
        });
        self
    }

    /// Succeeds with `stdout` at any privilege
    pub fn ok(self, pattern: &str, stdout: &str) -> Self {
        self.respond(pattern, Attempt::success(stdout), Attempt::success(stdout))
    }

    /// Exits 1 at any privilege
    pub fn fail(self, pattern: &str) -> Self {
        self.respond(pattern, Attempt::exited(1), Attempt::exited(1))
    }

    /// Fails unprivileged, succeeds with `stdout` when elevated
    pub fn elevated_only(self, pattern: &str, stdout: &str) -> Self {
        self.respond(pattern, Attempt::exited(1), Attempt::success(stdout))
    }

    /// Times out at any privilege
    pub fn timeout(self, pattern: &str) -> Self {
        self.respond(pattern, Attempt::timed_out(), Attempt::timed_out())
    }

    /// Make `command -v <name>` succeed
    pub fn tool(self, name: &str) -> Self {
        let pattern = format!("command -v {}", name);
        let path = format!("/usr/bin/{}\n", name);
        self.ok(&pattern, &path)
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(PathBuf::from(path), content.to_string());
        self
    }

    pub fn dir(mut self, path: &str, entries: &[&str]) -> Self {
        let dir = PathBuf::from(path);
        let mut listed: Vec<PathBuf> = entries.iter().map(|e| dir.join(e)).collect();
        listed.sort();
        self.dirs.insert(dir, listed);
        self
    }

    /// All executions so far, in order
    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of elevated executions
    pub fn escalations(&self) -> usize {
        self.calls().iter().filter(|c| c.elevated).count()
    }

    /// Number of executions whose command contains `pattern`
    pub fn call_count(&self, pattern: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.command.contains(pattern))
            .count()
    }

    fn record(&self, command: &str, elevated: bool) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(FakeCall {
                command: command.to_string(),
                elevated,
            });
        }
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(&self, command: &str, elevated: bool, _timeout: Duration) -> Attempt {
        self.record(command, elevated);

        match self.scripts.iter().find(|s| command.contains(&s.pattern)) {
            Some(script) if elevated => script.elevated.clone(),
            Some(script) => script.plain.clone(),
            None => Attempt::exited(127),
        }
    }

    async fn read_file(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }

    async fn list_dir(&self, path: &Path) -> Option<Vec<PathBuf>> {
        self.dirs.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::AttemptStatus;

    const T: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_first_matching_pattern_wins() {
        let fake = FakeExecutor::new()
            .ok("ip -6 route", "default via fe80::1 dev eth0\n")
            .ok("ip", "fallback\n");

        let attempt = fake.execute("ip -6 route show default", false, T).await;
        assert!(attempt.stdout.contains("fe80::1"));

        let attempt = fake.execute("ip -4 addr", false, T).await;
        assert_eq!(attempt.stdout, "fallback\n");
    }

    #[tokio::test]
    async fn test_unscripted_command_is_missing_tool() {
        let fake = FakeExecutor::new();
        let attempt = fake.execute("nc -z host 53", false, T).await;
        assert_eq!(attempt.status, AttemptStatus::NonZeroExit(127));
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let fake = FakeExecutor::new().elevated_only("journalctl", "line\n");
        let plain = fake.execute("journalctl -u x", false, T).await;
        let elevated = fake.execute("journalctl -u x", true, T).await;

        assert!(!plain.status.is_success());
        assert!(elevated.status.is_success());
        assert_eq!(fake.calls().len(), 2);
        assert_eq!(fake.escalations(), 1);
        assert_eq!(fake.call_count("journalctl"), 2);
    }

    #[tokio::test]
    async fn test_files_and_dirs() {
        let fake = FakeExecutor::new()
            .file("/sys/class/net/eth0/carrier", "1\n")
            .dir("/etc/systemd/network", &["20-wired.network", "10-lan.network"]);

        assert_eq!(
            fake.read_file(Path::new("/sys/class/net/eth0/carrier")).await,
            Some("1\n".to_string())
        );
        assert!(fake.read_file(Path::new("/etc/hosts")).await.is_none());

        let listed = fake.list_dir(Path::new("/etc/systemd/network")).await.unwrap();
        assert_eq!(listed[0], PathBuf::from("/etc/systemd/network/10-lan.network"));
    }
}
