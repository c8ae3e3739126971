//! Status Ledger
//!
//! Run-scoped accumulator of check outcomes. Every `record` call appends one
//! `Outcome`, bumps the counters, and streams the line to the output writer
//! before returning. Counters and the log are only touched together inside
//! `record`, so a snapshot always agrees with the entries.

use crate::severity::Severity;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};

/// Problem area an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Service,
    Link,
    Dhcp,
    Ipv6,
    Connectivity,
    Dns,
    Config,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Service => "network service",
            Category::Link => "link layer",
            Category::Dhcp => "DHCP",
            Category::Ipv6 => "IPv6",
            Category::Connectivity => "connectivity",
            Category::Dns => "DNS",
            Category::Config => "configuration",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified assertion. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub detail: Option<String>,
}

impl Outcome {
    pub fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            detail: None,
        }
    }

    pub fn pass(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Pass, category, message)
    }

    pub fn info(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    pub fn warn(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, category, message)
    }

    pub fn fail(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Fail, category, message)
    }

    /// Attach detail text; blank detail is dropped
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let trimmed = detail.trim();
        self.detail = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }
}

/// Counter snapshot handed to the reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub errors: usize,
    pub warnings: usize,
    pub checks: usize,
}

/// Append-only outcome log with streaming output
pub struct Ledger {
    entries: Vec<Outcome>,
    tally: Tally,
    verbose: bool,
    out: Box<dyn Write + Send>,
}

impl Ledger {
    /// Ledger streaming to stdout
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), verbose)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, verbose: bool) -> Self {
        Self {
            entries: Vec::new(),
            tally: Tally::default(),
            verbose,
            out,
        }
    }

    /// Ledger that renders nothing
    pub fn silent() -> Self {
        Self::with_writer(Box::new(io::sink()), false)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Append an outcome, update counters, and render it
    pub fn record(&mut self, outcome: Outcome) {
        self.tally.checks += 1;
        match outcome.severity {
            Severity::Fail => self.tally.errors += 1,
            Severity::Warn => self.tally.warnings += 1,
            Severity::Pass | Severity::Info => {}
        }
        self.render(&outcome);
        self.entries.push(outcome);
    }

    /// Probe heading; not a check
    pub fn section(&mut self, title: &str) {
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{}", console::style(title).bold());
        let _ = self.out.flush();
    }

    /// Extra diagnostic line, only shown in verbose mode; not a check
    pub fn note(&mut self, text: &str) {
        if self.verbose {
            let _ = writeln!(self.out, "         {}", console::style(text).dim());
            let _ = self.out.flush();
        }
    }

    pub fn snapshot(&self) -> Tally {
        self.tally
    }

    pub fn entries(&self) -> &[Outcome] {
        &self.entries
    }

    /// Number of recorded outcomes with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }

    /// Categories that produced at least one Warn or Fail
    pub fn problem_categories(&self) -> BTreeSet<Category> {
        self.entries
            .iter()
            .filter(|e| e.severity.is_problem())
            .map(|e| e.category)
            .collect()
    }

    /// Shared writer, used by the reporter to continue the same stream
    pub fn writer(&mut self) -> &mut (dyn Write + Send) {
        self.out.as_mut()
    }

    fn render(&mut self, outcome: &Outcome) {
        let _ = writeln!(
            self.out,
            "  {} {}",
            outcome.severity.styled_symbol(),
            outcome.message
        );

        let show_detail = self.verbose || outcome.severity.is_problem();
        if let (true, Some(detail)) = (show_detail, outcome.detail.as_deref()) {
            for line in detail.lines() {
                let _ = writeln!(self.out, "         {}", line);
            }
        }
        let _ = self.out.flush();
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("entries", &self.entries.len())
            .field("tally", &self.tally)
            .field("verbose", &self.verbose)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_counters_follow_severity() {
        let mut ledger = Ledger::silent();
        ledger.record(Outcome::pass(Category::Link, "carrier present"));
        ledger.record(Outcome::info(Category::Ipv6, "no global address"));
        ledger.record(Outcome::warn(Category::Dhcp, "lease errors"));
        ledger.record(Outcome::fail(Category::Service, "networkd inactive"));
        ledger.record(Outcome::fail(Category::Dns, "no nameservers"));

        let tally = ledger.snapshot();
        assert_eq!(tally.checks, 5);
        assert_eq!(tally.errors, 2);
        assert_eq!(tally.warnings, 1);
    }

    #[test]
    fn test_checks_equal_sum_of_tiers() {
        let mut ledger = Ledger::silent();
        let tiers = [
            Severity::Pass,
            Severity::Fail,
            Severity::Info,
            Severity::Pass,
            Severity::Warn,
            Severity::Info,
            Severity::Warn,
        ];
        for (i, sev) in tiers.iter().enumerate() {
            ledger.record(Outcome::new(*sev, Category::Config, format!("check {}", i)));

            let tally = ledger.snapshot();
            let sum = ledger.count(Severity::Pass)
                + ledger.count(Severity::Info)
                + ledger.count(Severity::Warn)
                + ledger.count(Severity::Fail);
            assert_eq!(tally.checks, sum);
            assert_eq!(tally.checks, ledger.entries().len());
            assert_eq!(tally.errors, ledger.count(Severity::Fail));
            assert_eq!(tally.warnings, ledger.count(Severity::Warn));
        }
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut ledger = Ledger::silent();
        for name in ["first", "second", "third"] {
            ledger.record(Outcome::pass(Category::Link, name));
        }
        let messages: Vec<_> = ledger.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_section_and_note_are_not_checks() {
        let mut ledger = Ledger::silent();
        ledger.section("Link layer");
        ledger.note("extra");
        assert_eq!(ledger.snapshot(), Tally::default());
    }

    #[test]
    fn test_detail_rendered_for_failures() {
        let buf = SharedBuf::default();
        let mut ledger = Ledger::with_writer(Box::new(buf.clone()), false);
        ledger.record(
            Outcome::fail(Category::Service, "systemd-networkd is not active")
                .with_detail("ActiveState=inactive\nSubState=dead"),
        );
        ledger.record(Outcome::pass(Category::Link, "carrier up").with_detail("carrier=1"));

        let text = buf.text();
        assert!(text.contains("systemd-networkd is not active"));
        assert!(text.contains("ActiveState=inactive"));
        assert!(text.contains("SubState=dead"));
        // pass details are verbose-only
        assert!(!text.contains("carrier=1"));
    }

    #[test]
    fn test_verbose_renders_all_details_and_notes() {
        let buf = SharedBuf::default();
        let mut ledger = Ledger::with_writer(Box::new(buf.clone()), true);
        ledger.record(Outcome::pass(Category::Link, "carrier up").with_detail("carrier=1"));
        ledger.note("read /sys/class/net/eth0/carrier");

        let text = buf.text();
        assert!(text.contains("carrier=1"));
        assert!(text.contains("read /sys/class/net/eth0/carrier"));
    }

    #[test]
    fn test_blank_detail_is_dropped() {
        let outcome = Outcome::warn(Category::Dns, "no upstream").with_detail("  \n ");
        assert_eq!(outcome.detail, None);
    }

    #[test]
    fn test_problem_categories() {
        let mut ledger = Ledger::silent();
        ledger.record(Outcome::pass(Category::Link, "ok"));
        ledger.record(Outcome::info(Category::Config, "no files"));
        ledger.record(Outcome::warn(Category::Dhcp, "errors in log"));
        ledger.record(Outcome::fail(Category::Dns, "no nameservers"));

        let cats: Vec<_> = ledger.problem_categories().into_iter().collect();
        assert_eq!(cats, vec![Category::Dhcp, Category::Dns]);
    }
}
