//! Orchestrator - runs the probe set
//!
//! Probes run one at a time in roster order. A probe never aborts the run:
//! whatever it could not determine is already an outcome in the ledger.

use crate::context::ProbeContext;
use crate::probes::{roster, Probe};
use netdoc_common::{Ledger, NetdocConfig, Tally};
use std::time::Instant;
use tracing::{debug, info};

pub struct Orchestrator {
    probes: Vec<Probe>,
}

impl Orchestrator {
    pub fn new(probes: Vec<Probe>) -> Self {
        Self { probes }
    }

    /// Orchestrator over the standard probe set
    pub fn standard(config: &NetdocConfig) -> Result<Self, regex::Error> {
        Ok(Self::new(roster::standard(config)?))
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Run every probe and return the final counters
    pub async fn run(&self, ctx: &ProbeContext, ledger: &mut Ledger) -> Tally {
        let started = Instant::now();

        for probe in &self.probes {
            ledger.section(probe.title());
            info!(probe = probe.title(), kind = probe.kind().as_str(), "running probe");
            let before = ledger.snapshot();
            let probe_started = Instant::now();

            probe.run(ctx, ledger).await;

            let after = ledger.snapshot();
            debug!(
                probe = probe.title(),
                kind = probe.kind().as_str(),
                checks = after.checks - before.checks,
                errors = after.errors - before.errors,
                warnings = after.warnings - before.warnings,
                elapsed_ms = probe_started.elapsed().as_millis() as u64,
                "probe finished"
            );
        }

        let tally = ledger.snapshot();
        info!(
            checks = tally.checks,
            errors = tally.errors,
            warnings = tally.warnings,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "diagnosis complete"
        );
        tally
    }
}
