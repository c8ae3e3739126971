//! Service-State probe
//!
//! Queries a systemd unit. Active is Pass; anything else is the probe's
//! configured severity with the captured unit properties as detail, and the
//! remaining sub-checks are skipped.

use crate::context::ProbeContext;
use netdoc_common::{Category, Ledger, Outcome, Severity};

/// Follow-up assertions, only evaluated while the unit is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCheck {
    /// Unit will start at boot
    EnabledAtBoot,
    /// networkd's view of the primary interface
    InterfaceState,
    /// Another manager that must not run at the same time
    NoConflictWith(String),
}

#[derive(Debug, Clone)]
pub struct ServiceProbe {
    pub unit: String,
    pub category: Category,
    /// Severity when the unit is not active
    pub inactive: Severity,
    pub checks: Vec<ServiceCheck>,
}

/// Properties parsed from `systemctl show`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitState {
    pub load: String,
    pub active: String,
    pub sub: String,
    pub unit_file: String,
}

pub fn show_command(unit: &str) -> String {
    format!(
        "systemctl show {} --no-pager -p LoadState -p ActiveState -p SubState -p UnitFileState",
        unit
    )
}

pub fn networkctl_status_command(iface: &str) -> String {
    format!("networkctl --no-pager status {}", iface)
}

pub fn is_active_command(unit: &str) -> String {
    format!("systemctl is-active {}", unit)
}

/// Parse `Key=Value` lines; None when ActiveState is missing
pub fn parse_unit_state(output: &str) -> Option<UnitState> {
    let mut state = UnitState::default();
    let mut saw_active = false;

    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key {
            "LoadState" => state.load = value,
            "ActiveState" => {
                state.active = value;
                saw_active = true;
            }
            "SubState" => state.sub = value,
            "UnitFileState" => state.unit_file = value,
            _ => {}
        }
    }

    saw_active.then_some(state)
}

/// Extract `(operational, setup)` from the `State:` line of `networkctl status`
///
/// `State: routable (configured)`
pub fn parse_link_state(output: &str) -> Option<(String, String)> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("State:"))?;
    let rest = line.trim_start_matches("State:").trim();
    let (operational, setup) = match rest.split_once('(') {
        Some((oper, setup)) => (oper.trim(), setup.trim_end_matches(')').trim()),
        None => (rest, ""),
    };
    Some((operational.to_string(), setup.to_string()))
}

pub fn classify_unit_file_state(unit: &str, category: Category, unit_file: &str) -> Outcome {
    match unit_file {
        "enabled" | "enabled-runtime" | "static" | "indirect" | "alias" | "generated" => {
            Outcome::pass(category, format!("{} starts at boot ({})", unit, unit_file))
        }
        "disabled" | "masked" | "masked-runtime" => Outcome::warn(
            category,
            format!("{} is running but {}; it will not start at boot", unit, unit_file),
        ),
        "" => Outcome::info(category, format!("Boot state of {} unknown", unit)),
        other => Outcome::info(category, format!("{} unit file state: {}", unit, other)),
    }
}

pub fn classify_link_state(iface: &str, operational: &str, setup: &str) -> Outcome {
    let cat = Category::Service;
    match (operational, setup) {
        (_, "failed") => Outcome::fail(cat, format!("networkd failed to configure {}", iface)),
        (_, "unmanaged") => Outcome::info(cat, format!("{} is not managed by networkd", iface)),
        (oper, "configuring" | "pending" | "initialized") => Outcome::warn(
            cat,
            format!("{} is still being configured ({})", iface, oper),
        ),
        ("routable", "configured") => {
            Outcome::pass(cat, format!("{} is routable and configured", iface))
        }
        (oper, "configured") => Outcome::warn(
            cat,
            format!("{} is configured but only {}", iface, oper),
        ),
        (oper, setup) => Outcome::info(cat, format!("{} state: {} ({})", iface, oper, setup)),
    }
}

impl ServiceProbe {
    pub async fn run(&self, ctx: &ProbeContext, ledger: &mut Ledger) {
        let result = ctx
            .runner
            .run_with_timeout(&show_command(&self.unit), ctx.fast_timeout())
            .await;

        let Some(state) = result
            .succeeded
            .then(|| parse_unit_state(&result.output))
            .flatten()
        else {
            ledger.record(
                Outcome::warn(self.category, format!("Could not query {} state", self.unit))
                    .with_detail("systemctl unavailable or returned no ActiveState"),
            );
            return;
        };

        if state.active != "active" {
            ledger.record(
                Outcome::new(
                    self.inactive,
                    self.category,
                    format!("{} is not active ({})", self.unit, state.active),
                )
                .with_detail(result.output.as_str()),
            );
            return;
        }

        ledger.record(Outcome::pass(
            self.category,
            format!("{} is active ({})", self.unit, state.sub),
        ));

        for check in &self.checks {
            let outcome = match check {
                ServiceCheck::EnabledAtBoot => {
                    classify_unit_file_state(&self.unit, self.category, &state.unit_file)
                }
                ServiceCheck::InterfaceState => self.interface_state(ctx).await,
                ServiceCheck::NoConflictWith(other) => self.conflict(ctx, other).await,
            };
            ledger.record(outcome);
        }
    }

    async fn interface_state(&self, ctx: &ProbeContext) -> Outcome {
        let Some(primary) = ctx.primary_interface().await else {
            return Outcome::info(
                self.category,
                "Interface state skipped: no primary interface",
            );
        };

        let result = ctx
            .runner
            .run_with_timeout(&networkctl_status_command(&primary.name), ctx.fast_timeout())
            .await;
        match result
            .succeeded
            .then(|| parse_link_state(&result.output))
            .flatten()
        {
            Some((operational, setup)) => classify_link_state(&primary.name, &operational, &setup),
            None => Outcome::info(
                self.category,
                format!("Could not read networkctl status for {}", primary.name),
            ),
        }
    }

    async fn conflict(&self, ctx: &ProbeContext, other: &str) -> Outcome {
        let result = ctx
            .runner
            .run_with_timeout(&is_active_command(other), ctx.fast_timeout())
            .await;
        if result.succeeded && result.trimmed() == "active" {
            Outcome::warn(
                self.category,
                format!("{} is also active and may fight {} over interfaces", other, self.unit),
            )
        } else {
            Outcome::pass(self.category, format!("No conflicting manager ({} not active)", other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::test_support::{context, with_primary};
    use netdoc_common::FakeExecutor;

    const ACTIVE: &str = "LoadState=loaded\nActiveState=active\nSubState=running\nUnitFileState=enabled\n";
    const INACTIVE: &str = "LoadState=loaded\nActiveState=inactive\nSubState=dead\nUnitFileState=disabled\n";

    fn networkd_probe() -> ServiceProbe {
        ServiceProbe {
            unit: "systemd-networkd".to_string(),
            category: Category::Service,
            inactive: Severity::Fail,
            checks: vec![
                ServiceCheck::EnabledAtBoot,
                ServiceCheck::InterfaceState,
                ServiceCheck::NoConflictWith("NetworkManager".to_string()),
            ],
        }
    }

    #[test]
    fn test_parse_unit_state() {
        let state = parse_unit_state(ACTIVE).unwrap();
        assert_eq!(state.active, "active");
        assert_eq!(state.sub, "running");
        assert_eq!(state.unit_file, "enabled");

        assert!(parse_unit_state("garbage\n").is_none());
    }

    #[test]
    fn test_parse_link_state() {
        let out = "● 2: eth0\n     Link File: /usr/lib/systemd/network/99-default.link\n             State: routable (configured)\n";
        assert_eq!(
            parse_link_state(out),
            Some(("routable".to_string(), "configured".to_string()))
        );
        assert_eq!(parse_link_state("nothing here"), None);
    }

    #[test]
    fn test_classify_link_state() {
        assert_eq!(classify_link_state("eth0", "routable", "configured").severity, Severity::Pass);
        assert_eq!(classify_link_state("eth0", "degraded", "configured").severity, Severity::Warn);
        assert_eq!(classify_link_state("eth0", "no-carrier", "configuring").severity, Severity::Warn);
        assert_eq!(classify_link_state("eth0", "off", "failed").severity, Severity::Fail);
        assert_eq!(classify_link_state("eth0", "routable", "unmanaged").severity, Severity::Info);
    }

    #[test]
    fn test_classify_unit_file_state() {
        let cat = Category::Service;
        assert_eq!(classify_unit_file_state("u", cat, "enabled").severity, Severity::Pass);
        assert_eq!(classify_unit_file_state("u", cat, "disabled").severity, Severity::Warn);
        assert_eq!(classify_unit_file_state("u", cat, "").severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_inactive_service_fails_with_detail_and_short_circuits() {
        let (ctx, fake) = context(FakeExecutor::new().ok("systemctl show systemd-networkd", INACTIVE));
        let mut ledger = Ledger::silent();

        networkd_probe().run(&ctx, &mut ledger).await;

        assert_eq!(ledger.entries().len(), 1);
        let entry = &ledger.entries()[0];
        assert_eq!(entry.severity, Severity::Fail);
        assert!(entry.detail.as_deref().unwrap().contains("ActiveState=inactive"));
        assert_eq!(ledger.snapshot().errors, 1);
        // sub-checks never ran
        assert_eq!(fake.call_count("networkctl"), 0);
        assert_eq!(fake.call_count("is-active"), 0);
    }

    #[tokio::test]
    async fn test_active_service_runs_sub_checks() {
        let fake = with_primary(
            FakeExecutor::new()
                .ok("systemctl show systemd-networkd", ACTIVE)
                .ok("networkctl --no-pager status eth0", "State: routable (configured)\n")
                .respond(
                    "systemctl is-active NetworkManager",
                    netdoc_common::Attempt::exited(3),
                    netdoc_common::Attempt::exited(3),
                ),
        );
        let (ctx, _fake) = context(fake);
        let mut ledger = Ledger::silent();

        networkd_probe().run(&ctx, &mut ledger).await;

        let severities: Vec<_> = ledger.entries().iter().map(|e| e.severity).collect();
        assert_eq!(severities, vec![Severity::Pass; 4]);
        assert_eq!(ledger.snapshot().errors, 0);
    }

    #[tokio::test]
    async fn test_conflicting_manager_warns() {
        let fake = with_primary(
            FakeExecutor::new()
                .ok("systemctl show systemd-networkd", ACTIVE)
                .ok("networkctl --no-pager status eth0", "State: routable (configured)\n")
                .ok("systemctl is-active NetworkManager", "active\n"),
        );
        let (ctx, _fake) = context(fake);
        let mut ledger = Ledger::silent();

        networkd_probe().run(&ctx, &mut ledger).await;

        let last = ledger.entries().last().unwrap();
        assert_eq!(last.severity, Severity::Warn);
        assert!(last.message.contains("NetworkManager"));
    }

    #[tokio::test]
    async fn test_unqueryable_service_is_warn_not_fail() {
        let (ctx, _fake) = context(FakeExecutor::new());
        let mut ledger = Ledger::silent();

        networkd_probe().run(&ctx, &mut ledger).await;

        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entries()[0].severity, Severity::Warn);
        assert_eq!(ledger.snapshot().errors, 0);
    }

    #[tokio::test]
    async fn test_interface_state_without_primary_is_info() {
        let (ctx, _fake) = context(FakeExecutor::new().ok("systemctl show systemd-networkd", ACTIVE));
        let mut ledger = Ledger::silent();

        let probe = ServiceProbe {
            checks: vec![ServiceCheck::InterfaceState],
            ..networkd_probe()
        };
        probe.run(&ctx, &mut ledger).await;

        assert_eq!(ledger.entries()[1].severity, Severity::Info);
        assert!(ledger.entries()[1].message.contains("no primary interface"));
    }
}
