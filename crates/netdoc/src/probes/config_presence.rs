//! Config-Presence probe
//!
//! Surveys static network configuration. Nothing found here is wrong on its
//! own, so every outcome is Info; the findings explain failures reported by
//! earlier probes.

use crate::context::ProbeContext;
use netdoc_common::{Category, Ledger, Outcome};
use std::path::{Path, PathBuf};

pub const NETWORK_DIR: &str = "/etc/systemd/network";

const STUB_RESOLV: &str = "/run/systemd/resolve/stub-resolv.conf";
const UPLINK_RESOLV: &str = "/run/systemd/resolve/resolv.conf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCheck {
    /// `.network` files present
    NetworkFiles,
    /// Settings known to break addressing
    ProblematicSettings,
    /// Where /etc/resolv.conf points
    ResolvConfTarget,
    /// Links networkd leaves alone
    UnmanagedLinks,
}

#[derive(Debug, Clone)]
pub struct ConfigProbe {
    pub category: Category,
    pub network_dir: PathBuf,
    pub checks: Vec<ConfigCheck>,
}

/// A known-problematic `Key=value` found in a `.network` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file: String,
    pub key: String,
    pub value: String,
    pub effect: &'static str,
}

impl ConfigProbe {
    pub fn new(category: Category, checks: Vec<ConfigCheck>) -> Self {
        Self {
            category,
            network_dir: PathBuf::from(NETWORK_DIR),
            checks,
        }
    }

    pub async fn run(&self, ctx: &ProbeContext, ledger: &mut Ledger) {
        for check in &self.checks {
            let outcome = match check {
                ConfigCheck::NetworkFiles => self.network_files(ctx).await,
                ConfigCheck::ProblematicSettings => self.problematic_settings(ctx).await,
                ConfigCheck::ResolvConfTarget => self.resolv_conf_target(ctx).await,
                ConfigCheck::UnmanagedLinks => self.unmanaged_links(ctx).await,
            };
            ledger.record(outcome);
        }
    }

    async fn network_files_in_dir(&self, ctx: &ProbeContext) -> Option<Vec<PathBuf>> {
        let entries = ctx.runner.list_dir(&self.network_dir).await?;
        Some(
            entries
                .into_iter()
                .filter(|p| p.extension().is_some_and(|ext| ext == "network"))
                .collect(),
        )
    }

    async fn network_files(&self, ctx: &ProbeContext) -> Outcome {
        let dir = self.network_dir.display();
        match self.network_files_in_dir(ctx).await {
            None => Outcome::info(self.category, format!("{} does not exist", dir)),
            Some(files) if files.is_empty() => Outcome::info(
                self.category,
                format!("No .network files in {}; networkd manages no interfaces", dir),
            ),
            Some(files) => Outcome::info(
                self.category,
                format!("{} .network file(s) in {}", files.len(), dir),
            )
            .with_detail(
                files
                    .iter()
                    .map(|f| file_name(f))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }

    async fn problematic_settings(&self, ctx: &ProbeContext) -> Outcome {
        let mut findings = Vec::new();
        for path in self.network_files_in_dir(ctx).await.unwrap_or_default() {
            if let Some(content) = ctx.runner.read_file(&path).await {
                findings.extend(scan_network_file(&file_name(&path), &content));
            }
        }

        if findings.is_empty() {
            return Outcome::info(self.category, "No known-problematic settings in .network files");
        }

        Outcome::info(
            self.category,
            format!("{} setting(s) that may affect addressing", findings.len()),
        )
        .with_detail(
            findings
                .iter()
                .map(|f| format!("{}: {}={} ({})", f.file, f.key, f.value, f.effect))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    async fn resolv_conf_target(&self, ctx: &ProbeContext) -> Outcome {
        let result = ctx
            .runner
            .run_with_timeout("readlink -f /etc/resolv.conf", ctx.fast_timeout())
            .await;
        if !result.succeeded || result.trimmed().is_empty() {
            return Outcome::info(self.category, "Could not resolve the /etc/resolv.conf target");
        }
        let message = match result.trimmed() {
            STUB_RESOLV => "/etc/resolv.conf uses the systemd-resolved stub".to_string(),
            UPLINK_RESOLV => "/etc/resolv.conf lists systemd-resolved upstreams directly".to_string(),
            "/etc/resolv.conf" => "/etc/resolv.conf is a static file".to_string(),
            other => format!("/etc/resolv.conf points to {}", other),
        };
        Outcome::info(self.category, message)
    }

    async fn unmanaged_links(&self, ctx: &ProbeContext) -> Outcome {
        let result = ctx
            .runner
            .run_with_timeout("networkctl --no-pager --no-legend list", ctx.fast_timeout())
            .await;
        if !result.succeeded {
            return Outcome::info(self.category, "networkctl unavailable; link management unknown");
        }
        let unmanaged = parse_unmanaged_links(&result.output);
        if unmanaged.is_empty() {
            Outcome::info(self.category, "All links are managed by systemd-networkd")
        } else {
            Outcome::info(
                self.category,
                format!("Unmanaged links: {}", unmanaged.join(", ")),
            )
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Find known-problematic settings in one `.network` file
pub fn scan_network_file(file: &str, content: &str) -> Vec<Finding> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';') && !l.starts_with('['))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            let lowered = value.to_ascii_lowercase();
            let effect = match key {
                "IPv6AcceptRA" if matches!(lowered.as_str(), "no" | "false" | "0") => {
                    "router advertisements ignored; no SLAAC address or IPv6 default route"
                }
                "LinkLocalAddressing" if matches!(lowered.as_str(), "no" | "false") => {
                    "no link-local addresses; IPv6 neighbor discovery cannot work"
                }
                "KeepConfiguration"
                    if matches!(
                        lowered.as_str(),
                        "yes" | "true" | "static" | "dynamic" | "dhcp" | "dhcp-on-stop"
                    ) =>
                {
                    "stale addresses and routes survive networkd restarts"
                }
                _ => return None,
            };
            Some(Finding {
                file: file.to_string(),
                key: key.to_string(),
                value: value.to_string(),
                effect,
            })
        })
        .collect()
}

/// Links other than loopback whose setup state is `unmanaged`
///
/// `  2 eth0 ether routable unmanaged`
pub fn parse_unmanaged_links(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            match cols.as_slice() {
                [_, name, _, _, "unmanaged", ..] if *name != "lo" => Some(name.to_string()),
                _ => None,
            }
        })
        .collect()
}
