//! Probe context
//!
//! Everything a probe needs besides the ledger: the command runner, the
//! configuration, and host facts several probes share (primary interface,
//! global IPv6 presence). Facts are discovered on first use and cached for
//! the rest of the run.

use netdoc_common::{CommandRunner, NetdocConfig};
use tokio::sync::OnceCell;
use tracing::debug;

pub const DEFAULT_ROUTE_V4: &str = "ip -4 route show default";
pub const DEFAULT_ROUTE_V6: &str = "ip -6 route show default";
pub const GLOBAL_V4_ADDRESSES: &str = "ip -4 -o addr show scope global";
pub const GLOBAL_V6_ADDRESSES: &str = "ip -6 -o addr show scope global";

/// Address family of a route or reachability test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn label(&self) -> &'static str {
        match self {
            Family::V4 => "IPv4",
            Family::V6 => "IPv6",
        }
    }

    fn default_route_command(&self) -> &'static str {
        match self {
            Family::V4 => DEFAULT_ROUTE_V4,
            Family::V6 => DEFAULT_ROUTE_V6,
        }
    }
}

/// Interface carrying a default route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryInterface {
    pub name: String,
    pub gateway: Option<String>,
    /// Family of the route the interface was found on
    pub family: Family,
}

pub struct ProbeContext {
    pub runner: CommandRunner,
    pub config: NetdocConfig,
    route_v4: OnceCell<Option<PrimaryInterface>>,
    route_v6: OnceCell<Option<PrimaryInterface>>,
    global_ipv4: OnceCell<bool>,
    global_ipv6: OnceCell<bool>,
}

impl ProbeContext {
    pub fn new(runner: CommandRunner, config: NetdocConfig) -> Self {
        Self {
            runner,
            config,
            route_v4: OnceCell::new(),
            route_v6: OnceCell::new(),
            global_ipv4: OnceCell::new(),
            global_ipv6: OnceCell::new(),
        }
    }

    pub fn fast_timeout(&self) -> u64 {
        self.config.runner.effective_fast_timeout()
    }

    pub fn log_timeout(&self) -> u64 {
        self.config.runner.effective_log_timeout()
    }

    /// Primary interface from the IPv4 default route, else the IPv6 one
    pub async fn primary_interface(&self) -> Option<&PrimaryInterface> {
        match self.default_route(Family::V4).await {
            Some(primary) => Some(primary),
            None => self.default_route(Family::V6).await,
        }
    }

    /// Default route of one address family
    pub async fn default_route(&self, family: Family) -> Option<&PrimaryInterface> {
        let cell = match family {
            Family::V4 => &self.route_v4,
            Family::V6 => &self.route_v6,
        };
        cell.get_or_init(|| async {
            let result = self
                .runner
                .run_with_timeout(family.default_route_command(), self.fast_timeout())
                .await;
            let route = result
                .succeeded
                .then(|| parse_default_route(&result.output, family))
                .flatten();
            if let Some(route) = &route {
                debug!(interface = %route.name, family = family.label(), "default route");
            }
            route
        })
        .await
        .as_ref()
    }

    /// Whether any global-scope IPv4 address is configured
    pub async fn has_global_ipv4(&self) -> bool {
        *self
            .global_ipv4
            .get_or_init(|| async {
                let result = self
                    .runner
                    .run_with_timeout(GLOBAL_V4_ADDRESSES, self.fast_timeout())
                    .await;
                result.succeeded && result.lines().any(|line| line.contains(" inet "))
            })
            .await
    }

    /// Whether any usable non-link-local IPv6 address is configured
    pub async fn has_global_ipv6(&self) -> bool {
        *self
            .global_ipv6
            .get_or_init(|| async {
                let result = self
                    .runner
                    .run_with_timeout(GLOBAL_V6_ADDRESSES, self.fast_timeout())
                    .await;
                result.succeeded && has_global_inet6(&result.output)
            })
            .await
    }
}

/// Pick the default route with the lowest metric from `ip route` output
///
/// `default via 192.168.1.1 dev wlan0 proto dhcp src 192.168.1.5 metric 600`
pub fn parse_default_route(output: &str, family: Family) -> Option<PrimaryInterface> {
    output
        .lines()
        .filter(|line| line.trim_start().starts_with("default"))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let value_after = |key: &str| {
                tokens
                    .iter()
                    .position(|t| *t == key)
                    .and_then(|i| tokens.get(i + 1))
                    .map(|v| v.to_string())
            };
            let name = value_after("dev")?;
            let metric = value_after("metric")
                .and_then(|m| m.parse::<u32>().ok())
                .unwrap_or(0);
            Some((
                metric,
                PrimaryInterface {
                    name,
                    gateway: value_after("via"),
                    family,
                },
            ))
        })
        .min_by_key(|(metric, _)| *metric)
        .map(|(_, primary)| primary)
}

/// Look for a usable global address in `ip -6 -o addr` output
pub fn has_global_inet6(output: &str) -> bool {
    output.lines().any(|line| {
        let mut tokens = line.split_whitespace().skip_while(|t| *t != "inet6");
        let Some(addr) = tokens.nth(1) else {
            return false;
        };
        let addr = addr.to_ascii_lowercase();
        !addr.starts_with("fe80")
            && !addr.starts_with("::1/")
            && !line.contains("tentative")
            && !line.contains("dadfailed")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdoc_common::FakeExecutor;
    use std::sync::Arc;

    #[test]
    fn test_parse_default_route() {
        let out = "default via 192.168.1.1 dev wlan0 proto dhcp src 192.168.1.5 metric 600\n";
        let primary = parse_default_route(out, Family::V4).unwrap();
        assert_eq!(primary.name, "wlan0");
        assert_eq!(primary.gateway.as_deref(), Some("192.168.1.1"));
    }

    #[test]
    fn test_parse_default_route_prefers_lowest_metric() {
        let out = "default via 192.168.1.1 dev wlan0 proto dhcp metric 600\n\
                   default via 10.0.0.1 dev enp3s0 proto dhcp metric 100\n";
        assert_eq!(parse_default_route(out, Family::V4).unwrap().name, "enp3s0");
    }

    #[test]
    fn test_parse_default_route_without_gateway() {
        let out = "default dev wg0 scope link\n";
        let primary = parse_default_route(out, Family::V4).unwrap();
        assert_eq!(primary.name, "wg0");
        assert_eq!(primary.gateway, None);
    }

    #[test]
    fn test_parse_default_route_empty() {
        assert_eq!(parse_default_route("", Family::V4), None);
        assert_eq!(parse_default_route("10.0.0.0/24 dev eth0 proto kernel\n", Family::V4), None);
    }

    #[test]
    fn test_has_global_inet6() {
        let global = "2: eth0    inet6 2001:db8::5/64 scope global dynamic mngtmpaddr \\       valid_lft 86000sec preferred_lft 14000sec\n";
        assert!(has_global_inet6(global));

        let link_local = "2: eth0    inet6 fe80::1/64 scope link \\       valid_lft forever\n";
        assert!(!has_global_inet6(link_local));

        let tentative = "2: eth0    inet6 2001:db8::5/64 scope global tentative \\       valid_lft forever\n";
        assert!(!has_global_inet6(tentative));

        assert!(!has_global_inet6(""));
    }

    #[tokio::test]
    async fn test_primary_interface_falls_back_to_ipv6_route() {
        let fake = Arc::new(
            FakeExecutor::new()
                .ok(DEFAULT_ROUTE_V4, "")
                .ok(DEFAULT_ROUTE_V6, "default via fe80::1 dev eth0 proto ra metric 1024\n"),
        );
        let ctx = ProbeContext::new(CommandRunner::new(fake.clone(), true), NetdocConfig::default());

        let primary = ctx.primary_interface().await.unwrap();
        assert_eq!(primary.name, "eth0");
        assert_eq!(primary.family, Family::V6);
        assert!(ctx.default_route(Family::V4).await.is_none());

        // cached after the first lookup
        ctx.primary_interface().await;
        assert_eq!(fake.call_count(DEFAULT_ROUTE_V4), 1);
    }

    #[tokio::test]
    async fn test_no_primary_interface() {
        let fake = Arc::new(FakeExecutor::new());
        let ctx = ProbeContext::new(CommandRunner::new(fake, true), NetdocConfig::default());
        assert!(ctx.primary_interface().await.is_none());
        assert!(!ctx.has_global_ipv4().await);
        assert!(!ctx.has_global_ipv6().await);
    }
}
