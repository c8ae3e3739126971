//! Probes
//!
//! The probe roster is fixed at build time, so probes are a closed set of
//! variants rather than a plugin trait. Each variant owns an explicit
//! extraction and classification step and reports through the ledger; none
//! of them returns an error.

pub mod config_presence;
pub mod connectivity;
pub mod log_scan;
pub mod roster;
pub mod service;
pub mod state;

use crate::context::ProbeContext;
use netdoc_common::Ledger;

pub use config_presence::{ConfigCheck, ConfigProbe};
pub use connectivity::{ConnectivityProbe, Family, Reach, Target};
pub use log_scan::LogScanProbe;
pub use service::{ServiceCheck, ServiceProbe};
pub use state::{Ipv6Scope, Reading, StateProbe};

/// Diagnostic logic of one probe
#[derive(Debug, Clone)]
pub enum ProbeKind {
    ServiceState(ServiceProbe),
    LogScan(LogScanProbe),
    StateInspection(StateProbe),
    Connectivity(ConnectivityProbe),
    ConfigPresence(ConfigProbe),
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::ServiceState(_) => "service-state",
            ProbeKind::LogScan(_) => "log-scan",
            ProbeKind::StateInspection(_) => "state-inspection",
            ProbeKind::Connectivity(_) => "connectivity",
            ProbeKind::ConfigPresence(_) => "config-presence",
        }
    }
}

/// A named entry in the probe set
#[derive(Debug, Clone)]
pub struct Probe {
    title: String,
    kind: ProbeKind,
}

impl Probe {
    pub fn new(title: impl Into<String>, kind: ProbeKind) -> Self {
        Self {
            title: title.into(),
            kind,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> &ProbeKind {
        &self.kind
    }

    /// Run the probe, recording one or more outcomes
    pub async fn run(&self, ctx: &ProbeContext, ledger: &mut Ledger) {
        match &self.kind {
            ProbeKind::ServiceState(probe) => probe.run(ctx, ledger).await,
            ProbeKind::LogScan(probe) => probe.run(ctx, ledger).await,
            ProbeKind::StateInspection(probe) => probe.run(ctx, ledger).await,
            ProbeKind::Connectivity(probe) => probe.run(ctx, ledger).await,
            ProbeKind::ConfigPresence(probe) => probe.run(ctx, ledger).await,
        }
    }
}

/// Shorten a log line for display without splitting a character
pub(crate) fn truncate_line(line: &str, max_chars: usize) -> String {
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let cut: String = line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::ProbeContext;
    use netdoc_common::{CommandRunner, FakeExecutor, NetdocConfig};
    use std::sync::Arc;

    /// Context over a fake host, running unprivileged with escalation enabled
    pub fn context(fake: FakeExecutor) -> (ProbeContext, Arc<FakeExecutor>) {
        context_with(fake, false)
    }

    pub fn context_with(fake: FakeExecutor, privileged: bool) -> (ProbeContext, Arc<FakeExecutor>) {
        let fake = Arc::new(fake);
        let runner = CommandRunner::new(fake.clone(), privileged);
        (ProbeContext::new(runner, NetdocConfig::default()), fake)
    }

    /// Fake host whose default route goes out of eth0
    pub fn with_primary(fake: FakeExecutor) -> FakeExecutor {
        fake.ok(
            crate::context::DEFAULT_ROUTE_V4,
            "default via 192.168.1.1 dev eth0 proto dhcp src 192.168.1.20 metric 100\n",
        )
        .ok(
            crate::context::GLOBAL_V4_ADDRESSES,
            "2: eth0    inet 192.168.1.20/24 brd 192.168.1.255 scope global dynamic eth0\n",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("short", 10), "short");
        assert_eq!(truncate_line("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate_line("ééééééééé", 6).chars().count(), 6);
    }
}
