//! Netdoc Common - engine pieces shared by the netdoc CLI
//!
//! Severity tiers, the status ledger, the privileged command runner and its
//! executor seam, and configuration.

pub mod config;
pub mod error;
pub mod executor;
pub mod fake;
pub mod ledger;
pub mod privilege;
pub mod runner;
pub mod severity;

pub use config::NetdocConfig;
pub use error::{NetdocError, Result};
pub use executor::{Attempt, AttemptStatus, Executor, RealExecutor};
pub use fake::{FakeCall, FakeExecutor};
pub use ledger::{Category, Ledger, Outcome, Tally};
pub use runner::{CommandResult, CommandRunner, DEFAULT_TIMEOUT_SECS};
pub use severity::Severity;
