//! Connectivity probe
//!
//! Each reach is tried through an ordered list of methods. Methods whose tool
//! is not installed are skipped; the first method that succeeds passes the
//! reach. When every installed method fails the reach gets its configured
//! failure severity, and when no method's tool is installed the reach could
//! not be tested at all (Warn).

pub use crate::context::Family;

use crate::context::ProbeContext;
use netdoc_common::{Category, Ledger, Outcome, Severity};
use tracing::debug;

fn family_flag(family: Family) -> &'static str {
    match family {
        Family::V4 => "-4",
        Family::V6 => "-6",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Default gateway of the primary interface
    Gateway,
    /// External host by address
    Address(String),
    /// TCP port 53 on a host
    DnsPort(String),
    Http(String),
    /// Name resolution through the system resolver
    Resolve(String),
}

/// One reachability assertion
#[derive(Debug, Clone)]
pub struct Reach {
    pub target: Target,
    pub on_failure: Severity,
}

impl Reach {
    pub fn new(target: Target, on_failure: Severity) -> Self {
        Self { target, on_failure }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    pub category: Category,
    /// Address family to force; None leaves it to the tool
    pub family: Option<Family>,
    pub reaches: Vec<Reach>,
}

/// A way of testing a reach with one external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub tool: &'static str,
    pub command: String,
}

impl Method {
    fn new(tool: &'static str, command: String) -> Self {
        Self { tool, command }
    }
}

impl ConnectivityProbe {
    pub fn new(category: Category, family: Option<Family>, reaches: Vec<Reach>) -> Self {
        Self {
            category,
            family,
            reaches,
        }
    }

    pub async fn run(&self, ctx: &ProbeContext, ledger: &mut Ledger) {
        if let Some(family) = self.family {
            let configured = match family {
                Family::V4 => ctx.has_global_ipv4().await,
                Family::V6 => ctx.has_global_ipv6().await,
            };
            if !configured {
                for reach in &self.reaches {
                    ledger.record(Outcome::info(
                        self.category,
                        format!(
                            "{} skipped: no global {} address",
                            describe(&reach.target, None),
                            family.label()
                        ),
                    ));
                }
                return;
            }
        }

        for reach in &self.reaches {
            let outcome = self.check(ctx, reach).await;
            ledger.record(outcome);
        }
    }

    async fn check(&self, ctx: &ProbeContext, reach: &Reach) -> Outcome {
        let connect = ctx.config.targets.effective_connect_timeout();
        let timeout = ctx.fast_timeout().max(connect + 2);

        let gateway;
        let target = match &reach.target {
            Target::Gateway => match self.gateway(ctx).await {
                Ok(address) => {
                    gateway = Target::Address(address);
                    &gateway
                }
                Err(skip) => return skip,
            },
            other => other,
        };
        let what = describe(target, Some(&reach.target));

        let mut tried = Vec::new();
        for method in methods(target, self.family, connect) {
            if !ctx.runner.has_tool(method.tool, ctx.fast_timeout()).await {
                debug!(tool = method.tool, "tool not installed, skipping");
                continue;
            }
            if ctx.runner.run_with_timeout(&method.command, timeout).await.succeeded {
                return Outcome::pass(self.category, reached(target, &what, method.tool));
            }
            tried.push(method.tool);
        }

        if tried.is_empty() {
            let tools: Vec<&str> = methods(target, self.family, connect)
                .iter()
                .map(|m| m.tool)
                .collect();
            return Outcome::warn(self.category, format!("Could not test {}", what))
                .with_detail(format!("none of these tools is installed: {}", tools.join(", ")));
        }

        Outcome::new(reach.on_failure, self.category, unreached(target, &what))
            .with_detail(format!("tried: {}", tried.join(", ")))
    }

    /// Gateway address on this check's family route, or the Info outcome explaining
    /// why there is none
    async fn gateway(&self, ctx: &ProbeContext) -> Result<String, Outcome> {
        let route = match self.family {
            Some(family) => ctx.default_route(family).await.ok_or_else(|| {
                Outcome::info(
                    self.category,
                    format!("Gateway skipped: no {} default route", family.label()),
                )
            })?,
            None => ctx.primary_interface().await.ok_or_else(|| {
                Outcome::info(self.category, "Gateway skipped: no primary interface")
            })?,
        };

        match &route.gateway {
            // link-local gateways are only reachable through their interface
            Some(gw) if gw.to_ascii_lowercase().starts_with("fe80:") => {
                Ok(format!("{}%{}", gw, route.name))
            }
            Some(gw) => Ok(gw.clone()),
            None => Err(Outcome::info(
                self.category,
                format!("{} has no gateway (point-to-point link)", route.name),
            )),
        }
    }
}

/// Human label for a target; `original` keeps gateway reaches labeled as such
fn describe(target: &Target, original: Option<&Target>) -> String {
    let is_gateway = matches!(original, Some(Target::Gateway)) || *target == Target::Gateway;
    match target {
        Target::Gateway => "Gateway".to_string(),
        Target::Address(host) if is_gateway => format!("Gateway {}", host),
        Target::Address(host) => host.clone(),
        Target::DnsPort(host) => format!("DNS port 53 on {}", host),
        Target::Http(url) => format!("HTTP {}", url),
        Target::Resolve(name) => format!("Name resolution of {}", name),
    }
}

fn reached(target: &Target, what: &str, tool: &str) -> String {
    match target {
        Target::Resolve(name) => format!("{} resolves via {}", name, tool),
        _ => format!("{} reachable via {}", what, tool),
    }
}

fn unreached(target: &Target, what: &str) -> String {
    match target {
        Target::Resolve(name) => format!("{} does not resolve", name),
        _ => format!("{} unreachable", what),
    }
}

/// Fallback chain for a target, in preference order
pub fn methods(target: &Target, family: Option<Family>, connect_secs: u64) -> Vec<Method> {
    let flag = family
        .map(|f| format!("{} ", family_flag(f)))
        .unwrap_or_default();
    let t = connect_secs;

    match target {
        Target::Gateway => Vec::new(),
        Target::Address(host) => vec![
            Method::new("ping", format!("ping {}-c 1 -W {} {}", flag, t, host)),
            Method::new("nc", format!("nc {}-z -w {} {} 443", flag, t, host)),
            Method::new("bash", bash_tcp(host, 443, t)),
        ],
        Target::DnsPort(host) => vec![
            Method::new("nc", format!("nc {}-z -w {} {} 53", flag, t, host)),
            Method::new("bash", bash_tcp(host, 53, t)),
        ],
        Target::Http(url) => vec![
            Method::new("curl", format!("curl {}-s -o /dev/null -m {} {}", flag, t, url)),
            Method::new("wget", format!("wget {}-q --spider -T {} {}", flag, t, url)),
        ],
        Target::Resolve(name) => vec![
            Method::new("resolvectl", format!("resolvectl query {}", name)),
            Method::new("getent", format!("getent ahosts {}", name)),
            Method::new("host", format!("host -W {} {}", t, name)),
        ],
    }
}

fn bash_tcp(host: &str, port: u16, secs: u64) -> String {
    format!("timeout {} bash -c 'exec 3<>/dev/tcp/{}/{}'", secs, host, port)
}
