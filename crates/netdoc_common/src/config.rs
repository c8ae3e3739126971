//! Netdoc Configuration
//!
//! Optional settings file at /etc/netdoc/config.toml. Every section and key
//! has a default, so an absent or partial file is fine. netdoc only reads it.

use crate::error::{NetdocError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// System configuration directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/netdoc";
const CONFIG_FILE: &str = "config.toml";

const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 120;
const MAX_WINDOW_HOURS: u64 = 720;

/// Command runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Timeout for ordinary commands (seconds)
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,

    /// Timeout for quick state queries and reachability attempts
    #[serde(default = "default_fast_timeout")]
    pub fast_timeout_secs: u64,

    /// Timeout for journal scans
    #[serde(default = "default_log_timeout")]
    pub log_timeout_secs: u64,

    /// Retry failed commands once with elevated privileges
    #[serde(default = "default_escalate")]
    pub escalate: bool,

    /// Argv prefix used for the elevated retry
    #[serde(default = "default_escalation_command")]
    pub escalation_command: Vec<String>,
}

fn default_timeout() -> u64 {
    10
}

fn default_fast_timeout() -> u64 {
    5
}

fn default_log_timeout() -> u64 {
    10
}

fn default_escalate() -> bool {
    true
}

fn default_escalation_command() -> Vec<String> {
    // -n: never prompt, a password prompt would only burn the timeout
    vec!["sudo".to_string(), "-n".to_string()]
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout(),
            fast_timeout_secs: default_fast_timeout(),
            log_timeout_secs: default_log_timeout(),
            escalate: default_escalate(),
            escalation_command: default_escalation_command(),
        }
    }
}

impl RunnerSettings {
    pub fn effective_default_timeout(&self) -> u64 {
        clamp_timeout(self.default_timeout_secs)
    }

    pub fn effective_fast_timeout(&self) -> u64 {
        clamp_timeout(self.fast_timeout_secs)
    }

    pub fn effective_log_timeout(&self) -> u64 {
        clamp_timeout(self.log_timeout_secs)
    }

    /// Escalation is usable only with a non-empty argv prefix
    pub fn escalation_enabled(&self) -> bool {
        self.escalate && !self.escalation_command.is_empty()
    }
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

/// Journal scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogScanSettings {
    /// How far back journal scans look (hours)
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,
}

fn default_window_hours() -> u64 {
    24
}

impl Default for LogScanSettings {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
        }
    }
}

impl LogScanSettings {
    pub fn effective_window_hours(&self) -> u64 {
        self.window_hours.clamp(1, MAX_WINDOW_HOURS)
    }
}

/// Reachability targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    #[serde(default = "default_ipv4_host")]
    pub ipv4_host: String,

    #[serde(default = "default_ipv6_host")]
    pub ipv6_host: String,

    /// Name used for the resolution test
    #[serde(default = "default_dns_name")]
    pub dns_name: String,

    #[serde(default = "default_http_url")]
    pub http_url: String,

    /// Timeout handed to ping/nc/curl themselves (seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_ipv4_host() -> String {
    "1.1.1.1".to_string()
}

fn default_ipv6_host() -> String {
    "2606:4700:4700::1111".to_string()
}

fn default_dns_name() -> String {
    "archlinux.org".to_string()
}

fn default_http_url() -> String {
    "http://archlinux.org/".to_string()
}

fn default_connect_timeout() -> u64 {
    3
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            ipv4_host: default_ipv4_host(),
            ipv6_host: default_ipv6_host(),
            dns_name: default_dns_name(),
            http_url: default_http_url(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl TargetSettings {
    pub fn effective_connect_timeout(&self) -> u64 {
        clamp_timeout(self.connect_timeout_secs)
    }
}

/// Which services play which role on this host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_network_manager")]
    pub network_manager: String,

    #[serde(default = "default_resolver")]
    pub resolver: String,

    /// Managers that must not run next to `network_manager`
    #[serde(default = "default_conflicting")]
    pub conflicting_managers: Vec<String>,
}

fn default_network_manager() -> String {
    "systemd-networkd".to_string()
}

fn default_resolver() -> String {
    "systemd-resolved".to_string()
}

fn default_conflicting() -> Vec<String> {
    vec!["NetworkManager".to_string()]
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            network_manager: default_network_manager(),
            resolver: default_resolver(),
            conflicting_managers: default_conflicting(),
        }
    }
}

/// Complete netdoc configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetdocConfig {
    #[serde(default)]
    pub runner: RunnerSettings,

    #[serde(default)]
    pub logs: LogScanSettings,

    #[serde(default)]
    pub targets: TargetSettings,

    #[serde(default)]
    pub services: ServiceSettings,
}

impl NetdocConfig {
    /// Load the system config, falling back to defaults when it is absent
    /// or unreadable
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load an explicitly named config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| NetdocError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| NetdocError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    PathBuf::from(SYSTEM_CONFIG_DIR).join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = NetdocConfig::default();
        assert_eq!(config.runner.default_timeout_secs, 10);
        assert_eq!(config.runner.fast_timeout_secs, 5);
        assert!(config.runner.escalate);
        assert_eq!(config.runner.escalation_command, vec!["sudo", "-n"]);
        assert_eq!(config.logs.window_hours, 24);
        assert_eq!(config.services.network_manager, "systemd-networkd");
        assert_eq!(config.targets.ipv4_host, "1.1.1.1");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = NetdocConfig::parse(
            r#"
            [runner]
            escalate = false

            [targets]
            dns_name = "example.org"
            "#,
        )
        .unwrap();

        assert!(!config.runner.escalate);
        assert_eq!(config.runner.default_timeout_secs, 10);
        assert_eq!(config.targets.dns_name, "example.org");
        assert_eq!(config.targets.ipv4_host, "1.1.1.1");
        assert_eq!(config.logs.window_hours, 24);
    }

    #[test]
    fn test_timeout_clamping() {
        let mut runner = RunnerSettings {
            default_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(runner.effective_default_timeout(), 1);

        runner.default_timeout_secs = 600;
        assert_eq!(runner.effective_default_timeout(), 120);

        runner.default_timeout_secs = 10;
        assert_eq!(runner.effective_default_timeout(), 10);

        let logs = LogScanSettings { window_hours: 0 };
        assert_eq!(logs.effective_window_hours(), 1);
    }

    #[test]
    fn test_empty_escalation_command_disables_escalation() {
        let runner = RunnerSettings {
            escalation_command: vec![],
            ..Default::default()
        };
        assert!(!runner.escalation_enabled());
        assert!(RunnerSettings::default().escalation_enabled());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logs]\nwindow_hours = 6").unwrap();

        let config = NetdocConfig::load_from(file.path()).unwrap();
        assert_eq!(config.logs.window_hours, 6);
    }

    #[test]
    fn test_load_from_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetdocConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, NetdocError::ConfigRead { .. }));
    }

    #[test]
    fn test_load_from_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runner]\nescalate = \"maybe\"").unwrap();

        let err = NetdocConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, NetdocError::ConfigParse { .. }));
        assert!(err.to_string().contains("invalid config file"));
    }
}
