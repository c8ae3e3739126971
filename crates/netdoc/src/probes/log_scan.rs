//! Log-Scan probe
//!
//! Reads a unit's journal over the configured window and counts lines that
//! match an error pattern. The journal is usually restricted for regular
//! users, so the scan command refuses to run against a partial journal and
//! lets the runner retry it elevated.

use super::truncate_line;
use crate::context::ProbeContext;
use netdoc_common::{Category, Ledger, Outcome, Severity};
use regex::Regex;

/// Matching lines shown as detail
const SAMPLE_LINES: usize = 3;
const MAX_LINE_CHARS: usize = 160;

/// Exit status the scan uses when the journal is only partially visible
const RESTRICTED_EXIT: i32 = 77;

#[derive(Debug, Clone)]
pub struct LogScanProbe {
    /// What a match means, e.g. "DHCP errors"
    pub label: String,
    pub category: Category,
    pub unit: String,
    pub pattern: Regex,
    /// Severity when at least one line matches
    pub on_match: Severity,
}

impl LogScanProbe {
    pub fn new(
        label: impl Into<String>,
        category: Category,
        unit: impl Into<String>,
        pattern: &str,
        on_match: Severity,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.into(),
            category,
            unit: unit.into(),
            pattern: Regex::new(pattern)?,
            on_match,
        })
    }

    pub async fn run(&self, ctx: &ProbeContext, ledger: &mut Ledger) {
        let hours = ctx.config.logs.effective_window_hours();
        let command = scan_command(&self.unit, hours);
        let result = ctx.runner.run_with_timeout(&command, ctx.log_timeout()).await;

        if !result.succeeded {
            ledger.record(self.unreadable());
            return;
        }

        let matches = matching_lines(&self.pattern, &result.output);
        ledger.note(&format!(
            "{} journal lines scanned for {}",
            result.lines().count(),
            self.unit
        ));
        if matches.is_empty() {
            ledger.record(Outcome::pass(
                self.category,
                format!("No {} in the last {}h", self.label, hours),
            ));
            return;
        }

        let sample: Vec<String> = matches
            .iter()
            .take(SAMPLE_LINES)
            .map(|line| truncate_line(line, MAX_LINE_CHARS))
            .collect();
        ledger.record(
            Outcome::new(
                self.on_match,
                self.category,
                format!(
                    "{} {} in the last {}h ({})",
                    matches.len(),
                    self.label,
                    hours,
                    self.unit
                ),
            )
            .with_detail(sample.join("\n")),
        );
    }

    /// An unreadable journal is reported one tier below a match, never Fail
    fn unreadable(&self) -> Outcome {
        let severity = match self.on_match {
            Severity::Fail => Severity::Warn,
            _ => Severity::Info,
        };
        Outcome::new(
            severity,
            self.category,
            format!("Could not read the {} journal to check for {}", self.unit, self.label),
        )
        .with_detail("journal access requires root or membership in systemd-journal/adm")
    }
}

/// Journal query for one unit over the last `hours`
pub fn scan_command(unit: &str, hours: u64) -> String {
    format!(
        "journalctl --no-pager -n 0 2>&1 | grep -qiE 'insufficient permissions|not seeing messages' && exit {}; \
         journalctl --no-pager -q -o cat -u {} --since \"{} hours ago\"",
        RESTRICTED_EXIT, unit, hours
    )
}

/// Non-blank journal lines matching `pattern`
pub fn matching_lines<'a>(pattern: &Regex, journal: &'a str) -> Vec<&'a str> {
    journal
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && pattern.is_match(line))
        .collect()
}
