//! Diagnostic logging
//!
//! Tracing output goes to stderr so it never interleaves with the report on
//! stdout. `NETDOC_LOG` takes an env-filter directive and wins over
//! `--verbose`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "NETDOC_LOG";

pub fn init(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // a subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
