//! State-Inspection probe
//!
//! Reads kernel and resolver state (sysfs, procfs, `ip`, resolv.conf) and
//! classifies each reading. Readings that need the primary interface report
//! Info when there is none; the missing interface itself is reported once by
//! the `PrimaryInterface` reading.

use crate::context::{Family, ProbeContext, DEFAULT_ROUTE_V6};
use netdoc_common::{Category, Ledger, Outcome, Severity};

pub const RESOLV_CONF: &str = "/etc/resolv.conf";
const RESOLVED_STUB: &str = "127.0.0.53";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv6Scope {
    /// `conf/all`
    All,
    /// The primary interface's own setting
    Primary,
}

/// A single host-state assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading {
    PrimaryInterface,
    Carrier,
    OperState,
    Ipv4Address,
    Ipv6Disabled(Ipv6Scope),
    GlobalIpv6,
    Ipv6DefaultRoute,
    Nameservers,
    ResolverUpstreams,
}

#[derive(Debug, Clone)]
pub struct StateProbe {
    pub category: Category,
    pub readings: Vec<Reading>,
}

impl StateProbe {
    pub fn new(category: Category, readings: Vec<Reading>) -> Self {
        Self { category, readings }
    }

    pub async fn run(&self, ctx: &ProbeContext, ledger: &mut Ledger) {
        for reading in &self.readings {
            let outcome = self.read(ctx, reading).await;
            ledger.record(outcome);
        }
    }

    async fn read(&self, ctx: &ProbeContext, reading: &Reading) -> Outcome {
        let cat = self.category;
        match reading {
            Reading::PrimaryInterface => match ctx.primary_interface().await {
                Some(primary) => {
                    let via = primary
                        .gateway
                        .as_deref()
                        .map(|gw| format!(" via {}", gw))
                        .unwrap_or_default();
                    Outcome::pass(cat, format!("Primary interface {}{}", primary.name, via))
                }
                None => Outcome::fail(cat, "No default route; no primary interface found")
                    .with_detail("`ip route show default` returned no default route for IPv4 or IPv6"),
            },
            Reading::Carrier => {
                let Some(iface) = primary_name(ctx).await else {
                    return skipped(cat, "Carrier");
                };
                let value = ctx.runner.read_file(sysfs(&iface, "carrier")).await;
                classify_carrier(cat, &iface, value.as_deref())
            }
            Reading::OperState => {
                let Some(iface) = primary_name(ctx).await else {
                    return skipped(cat, "Operational state");
                };
                let value = ctx.runner.read_file(sysfs(&iface, "operstate")).await;
                classify_operstate(cat, &iface, value.as_deref())
            }
            Reading::Ipv4Address => {
                let Some(iface) = primary_name(ctx).await else {
                    return skipped(cat, "IPv4 address");
                };
                let result = ctx
                    .runner
                    .run_with_timeout(&format!("ip -4 -o addr show dev {}", iface), ctx.fast_timeout())
                    .await;
                let outcome =
                    classify_ipv4(cat, &iface, result.succeeded.then_some(result.output.as_str()));
                if outcome.severity == Severity::Fail && ipv6_only(ctx).await {
                    return Outcome::info(
                        cat,
                        format!("{} has no IPv4 address (IPv6-only host)", iface),
                    );
                }
                outcome
            }
            Reading::Ipv6Disabled(scope) => {
                let target = match scope {
                    Ipv6Scope::All => "all".to_string(),
                    Ipv6Scope::Primary => match primary_name(ctx).await {
                        Some(iface) => iface,
                        None => return skipped(cat, "IPv6 sysctl"),
                    },
                };
                let value = ctx
                    .runner
                    .read_file(format!("/proc/sys/net/ipv6/conf/{}/disable_ipv6", target))
                    .await;
                classify_disable_ipv6(cat, &target, value.as_deref())
            }
            Reading::GlobalIpv6 => {
                if ctx.has_global_ipv6().await {
                    Outcome::pass(cat, "Global IPv6 address present")
                } else {
                    Outcome::info(cat, "No global IPv6 address (IPv4-only host)")
                }
            }
            Reading::Ipv6DefaultRoute => {
                if !ctx.has_global_ipv6().await {
                    return Outcome::info(cat, "IPv6 default route skipped: no global IPv6 address");
                }
                let result = ctx
                    .runner
                    .run_with_timeout(DEFAULT_ROUTE_V6, ctx.fast_timeout())
                    .await;
                if result.succeeded && result.lines().any(|l| l.starts_with("default")) {
                    Outcome::pass(cat, "IPv6 default route present")
                } else {
                    Outcome::warn(cat, "Global IPv6 address but no IPv6 default route")
                        .with_detail("router advertisements may not be accepted on this link")
                }
            }
            Reading::Nameservers => {
                let content = ctx.runner.read_file(RESOLV_CONF).await;
                classify_nameservers(cat, content.as_deref())
            }
            Reading::ResolverUpstreams => {
                let result = ctx
                    .runner
                    .run_with_timeout("resolvectl dns", ctx.fast_timeout())
                    .await;
                if !result.succeeded {
                    return Outcome::info(cat, "resolvectl unavailable; upstream servers unknown");
                }
                let servers = parse_resolvectl_dns(&result.output);
                if servers.is_empty() {
                    Outcome::warn(cat, "systemd-resolved has no upstream DNS servers")
                } else {
                    Outcome::pass(cat, format!("Upstream DNS: {}", servers.join(", ")))
                }
            }
        }
    }
}

async fn primary_name(ctx: &ProbeContext) -> Option<String> {
    ctx.primary_interface().await.map(|p| p.name.clone())
}

/// No IPv4 default route and no global IPv4 address anywhere
async fn ipv6_only(ctx: &ProbeContext) -> bool {
    ctx.default_route(Family::V4).await.is_none() && !ctx.has_global_ipv4().await
}

fn skipped(cat: Category, what: &str) -> Outcome {
    Outcome::info(cat, format!("{} skipped: no primary interface", what))
}

fn sysfs(iface: &str, attr: &str) -> String {
    format!("/sys/class/net/{}/{}", iface, attr)
}

pub fn classify_carrier(cat: Category, iface: &str, value: Option<&str>) -> Outcome {
    match value.map(str::trim) {
        Some("1") => Outcome::pass(cat, format!("{} has carrier", iface)),
        Some("0") => Outcome::fail(cat, format!("{} has no carrier (cable unplugged or no association)", iface)),
        _ => Outcome::info(cat, format!("Carrier state of {} unavailable", iface)),
    }
}

pub fn classify_operstate(cat: Category, iface: &str, value: Option<&str>) -> Outcome {
    match value.map(str::trim) {
        Some("up") => Outcome::pass(cat, format!("{} is up", iface)),
        Some(state @ ("down" | "lowerlayerdown")) => {
            Outcome::fail(cat, format!("{} is {}", iface, state))
        }
        Some("dormant") => Outcome::warn(cat, format!("{} is dormant (waiting for authentication)", iface)),
        Some(other) if !other.is_empty() => {
            Outcome::info(cat, format!("{} operational state: {}", iface, other))
        }
        _ => Outcome::info(cat, format!("Operational state of {} unavailable", iface)),
    }
}

/// Classify `ip -4 -o addr show dev IF`; a `dynamic` address came from DHCP
pub fn classify_ipv4(cat: Category, iface: &str, output: Option<&str>) -> Outcome {
    let Some(output) = output else {
        return Outcome::warn(cat, format!("Could not read IPv4 addresses of {}", iface));
    };

    let line = output.lines().find(|l| l.contains(" inet "));
    let address = line.and_then(|l| {
        l.split_whitespace()
            .skip_while(|t| *t != "inet")
            .nth(1)
            .map(str::to_string)
    });

    match (line, address) {
        (Some(line), Some(address)) if line.contains("dynamic") => {
            Outcome::pass(cat, format!("DHCP lease {} on {}", address, iface))
        }
        (Some(_), Some(address)) => {
            Outcome::pass(cat, format!("Static IPv4 address {} on {}", address, iface))
        }
        _ => Outcome::fail(cat, format!("{} has no IPv4 address", iface)),
    }
}

pub fn classify_disable_ipv6(cat: Category, target: &str, value: Option<&str>) -> Outcome {
    match value.map(str::trim) {
        Some("0") => Outcome::pass(cat, format!("IPv6 enabled ({})", target)),
        Some("1") => Outcome::info(cat, format!("IPv6 disabled by sysctl ({})", target)),
        _ => Outcome::info(cat, format!("IPv6 sysctl for {} unreadable", target)),
    }
}

/// `nameserver` entries of a resolv.conf
pub fn parse_nameservers(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#') && !l.starts_with(';'))
        .filter_map(|l| {
            let mut tokens = l.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some("nameserver"), Some(addr)) => Some(addr.to_string()),
                _ => None,
            }
        })
        .collect()
}

pub fn classify_nameservers(cat: Category, content: Option<&str>) -> Outcome {
    let Some(content) = content else {
        return Outcome::warn(cat, format!("{} is missing or unreadable", RESOLV_CONF));
    };
    let servers = parse_nameservers(content);
    if servers.is_empty() {
        Outcome::fail(cat, format!("No nameserver entries in {}", RESOLV_CONF))
    } else if servers.iter().any(|s| s == RESOLVED_STUB) {
        Outcome::pass(cat, format!("Using the systemd-resolved stub ({})", RESOLVED_STUB))
    } else {
        Outcome::pass(cat, format!("Nameservers: {}", servers.join(", ")))
    }
}

/// Server addresses from `resolvectl dns`
///
/// `Link 2 (eth0): 192.168.1.1 fd00::1`
pub fn parse_resolvectl_dns(output: &str) -> Vec<String> {
    let mut servers: Vec<String> = Vec::new();
    for line in output.lines() {
        let Some((_, rest)) = line.split_once(':') else {
            continue;
        };
        for server in rest.split_whitespace() {
            if !servers.iter().any(|s| s == server) {
                servers.push(server.to_string());
            }
        }
    }
    servers
}
