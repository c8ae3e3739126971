//! Netdoc - network health diagnosis for systemd-networkd hosts
//!
//! Runs a fixed, ordered set of probes against the host, records every
//! classified outcome in a status ledger, and turns the final counters into
//! a verdict and exit code.

pub mod cli;
pub mod context;
pub mod logging;
pub mod orchestrator;
pub mod probes;
pub mod reporter;

pub use context::ProbeContext;
pub use orchestrator::Orchestrator;
