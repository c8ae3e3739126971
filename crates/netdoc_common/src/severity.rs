//! Severity tiers for a single check outcome.
//!
//! Ordered by operator impact: `Pass < Info < Warn < Fail`. The ordering is
//! only used for counter routing and verdict derivation, never as a score.

use console::{style, StyledObject};
use std::fmt;

/// Classification of one assertion made by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Confirmed healthy
    Pass,
    /// Informational, no health implication
    Info,
    /// Degraded, ambiguous, or a best-practice deviation
    Warn,
    /// Confirmed broken condition
    Fail,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Pass => "PASS",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Fail => "FAIL",
        }
    }

    /// Fixed-width tag used in the streamed report
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Pass => "[OK]  ",
            Severity::Info => "[INFO]",
            Severity::Warn => "[WARN]",
            Severity::Fail => "[FAIL]",
        }
    }

    /// Symbol with terminal colors (disabled automatically when not a tty)
    pub fn styled_symbol(&self) -> StyledObject<&'static str> {
        let symbol = style(self.symbol());
        match self {
            Severity::Pass => symbol.green(),
            Severity::Info => symbol.cyan(),
            Severity::Warn => symbol.yellow(),
            Severity::Fail => symbol.red().bold(),
        }
    }

    /// Warn or Fail
    pub fn is_problem(&self) -> bool {
        matches!(self, Severity::Warn | Severity::Fail)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
