//! The standard probe set, in run order

use super::{
    ConfigCheck, ConfigProbe, ConnectivityProbe, Family, Ipv6Scope, LogScanProbe, Probe,
    ProbeKind, Reach, Reading, ServiceCheck, ServiceProbe, StateProbe, Target,
};
use netdoc_common::{Category, NetdocConfig, Severity};

pub const DHCP_ERROR_PATTERN: &str =
    r"(?i)dhcp(v4|v6|4|6)?.*(fail|error|timed? ?out|lost|could not|no (lease|offer))";
pub const GENERIC_ERROR_PATTERN: &str = r"(?i)\b(error|failed|failure)\b";
pub const NDISC_ERROR_PATTERN: &str =
    r"(?i)ndisc.*(fail|error|could not|invalid)|could not (set|remove|configure) ndisc route";

/// Build the fixed probe set from configuration
pub fn standard(config: &NetdocConfig) -> Result<Vec<Probe>, regex::Error> {
    let services = &config.services;
    let targets = &config.targets;
    let manager = services.network_manager.as_str();

    let mut manager_checks = vec![ServiceCheck::EnabledAtBoot, ServiceCheck::InterfaceState];
    manager_checks.extend(
        services
            .conflicting_managers
            .iter()
            .filter(|other| other.as_str() != manager)
            .map(|other| ServiceCheck::NoConflictWith(other.clone())),
    );

    Ok(vec![
        Probe::new(
            "Network manager",
            ProbeKind::ServiceState(ServiceProbe {
                unit: manager.to_string(),
                category: Category::Service,
                inactive: Severity::Fail,
                checks: manager_checks,
            }),
        ),
        Probe::new(
            "Network manager errors",
            ProbeKind::LogScan(LogScanProbe::new(
                "errors",
                Category::Service,
                manager,
                GENERIC_ERROR_PATTERN,
                Severity::Warn,
            )?),
        ),
        Probe::new(
            "Link layer",
            ProbeKind::StateInspection(StateProbe::new(
                Category::Link,
                vec![Reading::PrimaryInterface, Reading::Carrier, Reading::OperState],
            )),
        ),
        Probe::new(
            "DHCP lease",
            ProbeKind::StateInspection(StateProbe::new(Category::Dhcp, vec![Reading::Ipv4Address])),
        ),
        Probe::new(
            "DHCP errors",
            ProbeKind::LogScan(LogScanProbe::new(
                "DHCP errors",
                Category::Dhcp,
                manager,
                DHCP_ERROR_PATTERN,
                Severity::Warn,
            )?),
        ),
        Probe::new(
            "IPv6 stack",
            ProbeKind::StateInspection(StateProbe::new(
                Category::Ipv6,
                vec![
                    Reading::Ipv6Disabled(Ipv6Scope::All),
                    Reading::Ipv6Disabled(Ipv6Scope::Primary),
                    Reading::GlobalIpv6,
                    Reading::Ipv6DefaultRoute,
                ],
            )),
        ),
        Probe::new(
            "NDisc routes",
            ProbeKind::LogScan(LogScanProbe::new(
                "NDisc route errors",
                Category::Ipv6,
                manager,
                NDISC_ERROR_PATTERN,
                Severity::Fail,
            )?),
        ),
        Probe::new(
            "IPv4 connectivity",
            ProbeKind::Connectivity(ConnectivityProbe::new(
                Category::Connectivity,
                Some(Family::V4),
                vec![
                    Reach::new(Target::Gateway, Severity::Fail),
                    Reach::new(Target::Address(targets.ipv4_host.clone()), Severity::Fail),
                    Reach::new(Target::DnsPort(targets.ipv4_host.clone()), Severity::Warn),
                    Reach::new(Target::Http(targets.http_url.clone()), Severity::Warn),
                ],
            )),
        ),
        Probe::new(
            "IPv6 connectivity",
            ProbeKind::Connectivity(ConnectivityProbe::new(
                Category::Connectivity,
                Some(Family::V6),
                vec![
                    Reach::new(Target::Address(targets.ipv6_host.clone()), Severity::Fail),
                    Reach::new(Target::DnsPort(targets.ipv6_host.clone()), Severity::Warn),
                    Reach::new(Target::Http(targets.http_url.clone()), Severity::Warn),
                ],
            )),
        ),
        Probe::new(
            "Resolver service",
            ProbeKind::ServiceState(ServiceProbe {
                unit: services.resolver.clone(),
                category: Category::Dns,
                inactive: Severity::Warn,
                checks: vec![ServiceCheck::EnabledAtBoot],
            }),
        ),
        Probe::new(
            "DNS configuration",
            ProbeKind::StateInspection(StateProbe::new(
                Category::Dns,
                vec![Reading::Nameservers, Reading::ResolverUpstreams],
            )),
        ),
        Probe::new(
            "Name resolution",
            ProbeKind::Connectivity(ConnectivityProbe::new(
                Category::Dns,
                None,
                vec![Reach::new(Target::Resolve(targets.dns_name.clone()), Severity::Fail)],
            )),
        ),
        Probe::new(
            "Static configuration",
            ProbeKind::ConfigPresence(ConfigProbe::new(
                Category::Config,
                vec![
                    ConfigCheck::NetworkFiles,
                    ConfigCheck::ProblematicSettings,
                    ConfigCheck::ResolvConfTarget,
                    ConfigCheck::UnmanagedLinks,
                ],
            )),
        ),
    ])
}
