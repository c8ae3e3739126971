//! Reporter - header, summary, verdict and exit code

use chrono::Local;
use console::style;
use netdoc_common::{Category, Ledger, Tally};
use std::fmt;
use std::io::Write;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

const VERBOSE_HINT: &str = "rerun with --verbose for journal and lookup details";

/// Fixed troubleshooting steps printed whenever the run fails
pub const REMEDIATION_CHECKLIST: &[&str] = &[
    "Check the cable or Wi-Fi association: ip link show",
    "Restart the network manager: sudo systemctl restart systemd-networkd",
    "Inspect link state: networkctl status",
    "Read recent manager logs: journalctl -u systemd-networkd -b",
    "Verify the default route: ip route show default",
    "Test name resolution: resolvectl query archlinux.org",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    PassWithWarnings,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::PassWithWarnings => "PASS WITH WARNINGS",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn verdict(tally: Tally) -> Verdict {
    match (tally.errors, tally.warnings) {
        (0, 0) => Verdict::Pass,
        (0, _) => Verdict::PassWithWarnings,
        _ => Verdict::Fail,
    }
}

/// Depends only on the error and warning counters
pub fn exit_code(tally: Tally) -> u8 {
    if tally.errors > 0 {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

/// Targeted hints for a problem category
pub fn category_hints(category: Category) -> &'static [&'static str] {
    match category {
        Category::Service => &[
            "Enable and start systemd-networkd: sudo systemctl enable --now systemd-networkd",
            "Run only one network manager at a time",
        ],
        Category::Link => &[
            "Bring the interface up: sudo ip link set <iface> up",
            "For Wi-Fi, check iwd or wpa_supplicant status",
        ],
        Category::Dhcp => &[
            "Renew the lease: sudo networkctl reconfigure <iface>",
            "Check that the .network file for the interface sets DHCP=yes",
        ],
        Category::Ipv6 => &[
            "Allow router advertisements: remove IPv6AcceptRA=no from the .network file",
            "Check /proc/sys/net/ipv6/conf/*/disable_ipv6",
        ],
        Category::Connectivity => &[
            "Ping the gateway directly to tell local from upstream problems",
            "Check firewall rules: sudo nft list ruleset",
        ],
        Category::Dns => &[
            "Restart the resolver: sudo systemctl restart systemd-resolved",
            "Point /etc/resolv.conf at the stub: ln -sf /run/systemd/resolve/stub-resolv.conf /etc/resolv.conf",
        ],
        Category::Config => &["Review files under /etc/systemd/network"],
    }
}

/// Run header printed before the first probe
pub fn header(out: &mut dyn Write, privileged: bool, escalate: bool) {
    let mode = match (privileged, escalate) {
        (true, _) => "running as root",
        (false, true) => "unprivileged, elevated retry via sudo",
        (false, false) => "unprivileged, no elevated retry",
    };
    let _ = writeln!(out, "{}", style("netdoc - network health diagnosis").bold());
    let _ = writeln!(
        out,
        "{} ({})",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        mode
    );
    let _ = out.flush();
}

/// Print the summary and remediation, returning the process exit code
pub fn summarize(ledger: &mut Ledger) -> u8 {
    let tally = ledger.snapshot();
    let problems = ledger.problem_categories();
    let result = verdict(tally);
    let verbose = ledger.is_verbose();
    let out = ledger.writer();

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", style("Summary").bold());
    let _ = writeln!(
        out,
        "  checks: {}  errors: {}  warnings: {}",
        tally.checks, tally.errors, tally.warnings
    );

    let verdict_line = match result {
        Verdict::Pass => style(result.as_str()).green().bold(),
        Verdict::PassWithWarnings => style(result.as_str()).yellow().bold(),
        Verdict::Fail => style(result.as_str()).red().bold(),
    };
    let _ = writeln!(out, "  result: {}", verdict_line);
    if result != Verdict::Pass && !verbose {
        let _ = writeln!(out, "  {}", style(VERBOSE_HINT).dim());
    }

    if result == Verdict::Fail {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", style("Troubleshooting checklist").bold());
        for (i, step) in REMEDIATION_CHECKLIST.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, step);
        }

        for category in &problems {
            let _ = writeln!(out);
            let _ = writeln!(out, "  {} problems:", category);
            for hint in category_hints(*category) {
                let _ = writeln!(out, "    - {}", hint);
            }
        }
    }

    let _ = out.flush();
    exit_code(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdoc_common::Outcome;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn tally(errors: usize, warnings: usize) -> Tally {
        Tally {
            errors,
            warnings,
            checks: errors + warnings + 3,
        }
    }

    #[test]
    fn test_exit_code_ignores_warnings() {
        assert_eq!(exit_code(tally(0, 0)), 0);
        assert_eq!(exit_code(tally(0, 7)), 0);
        assert_eq!(exit_code(tally(1, 0)), 1);
        assert_eq!(exit_code(tally(4, 9)), 1);
    }

    #[test]
    fn test_verdict() {
        assert_eq!(verdict(tally(0, 0)), Verdict::Pass);
        assert_eq!(verdict(tally(0, 2)), Verdict::PassWithWarnings);
        assert_eq!(verdict(tally(1, 2)), Verdict::Fail);
    }

    #[test]
    fn test_summary_on_failure_lists_checklist_and_hints() {
        let buf = SharedBuf::default();
        let mut ledger = Ledger::with_writer(Box::new(buf.clone()), false);
        ledger.record(Outcome::fail(Category::Dns, "No nameserver entries"));
        ledger.record(Outcome::warn(Category::Ipv6, "No IPv6 default route"));

        let code = summarize(&mut ledger);

        let text = buf.text();
        assert_eq!(code, 1);
        assert!(text.contains("errors: 1  warnings: 1"));
        assert!(text.contains("FAIL"));
        assert!(text.contains(REMEDIATION_CHECKLIST[0]));
        assert!(text.contains("DNS problems:"));
        assert!(text.contains("IPv6 problems:"));
    }

    #[test]
    fn test_summary_with_warnings_has_no_checklist() {
        let buf = SharedBuf::default();
        let mut ledger = Ledger::with_writer(Box::new(buf.clone()), false);
        ledger.record(Outcome::pass(Category::Link, "eth0 is up"));
        ledger.record(Outcome::warn(Category::Dhcp, "2 DHCP errors"));

        let code = summarize(&mut ledger);

        let text = buf.text();
        assert_eq!(code, 0);
        assert!(text.contains("PASS WITH WARNINGS"));
        assert!(!text.contains("Troubleshooting checklist"));
    }

    #[test]
    fn test_verbose_hint_only_when_quiet() {
        let quiet = SharedBuf::default();
        let mut ledger = Ledger::with_writer(Box::new(quiet.clone()), false);
        ledger.record(Outcome::warn(Category::Dhcp, "2 DHCP errors"));
        summarize(&mut ledger);
        assert!(quiet.text().contains(VERBOSE_HINT));

        let verbose = SharedBuf::default();
        let mut ledger = Ledger::with_writer(Box::new(verbose.clone()), true);
        ledger.record(Outcome::warn(Category::Dhcp, "2 DHCP errors"));
        summarize(&mut ledger);
        assert!(!verbose.text().contains(VERBOSE_HINT));

        let clean = SharedBuf::default();
        let mut ledger = Ledger::with_writer(Box::new(clean.clone()), false);
        ledger.record(Outcome::pass(Category::Link, "eth0 is up"));
        summarize(&mut ledger);
        assert!(!clean.text().contains(VERBOSE_HINT));
    }

    #[test]
    fn test_header_mentions_privilege_mode() {
        let mut buf = Vec::new();
        header(&mut buf, false, false);
        assert!(String::from_utf8_lossy(&buf).contains("no elevated retry"));
    }
}
