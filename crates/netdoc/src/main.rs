//! netdoc - network health diagnosis CLI

use anyhow::{Context, Result};
use netdoc::cli::{self, Cli};
use netdoc::{logging, reporter, Orchestrator, ProbeContext};
use netdoc_common::{CommandRunner, Ledger};
use std::process::ExitCode;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            let code = cli::exit_code_for(&e);
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    logging::init(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("netdoc: {:#}", e);
            ExitCode::from(reporter::EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = cli.load_config()?;
    let runner = CommandRunner::from_settings(&config.runner);
    let orchestrator = Orchestrator::standard(&config).context("building probe set")?;

    info!(
        privileged = runner.is_privileged(),
        escalate = runner.will_escalate(),
        probes = orchestrator.probes().len(),
        "starting diagnosis"
    );

    let mut ledger = Ledger::new(cli.verbose);
    reporter::header(ledger.writer(), runner.is_privileged(), runner.will_escalate());

    let ctx = ProbeContext::new(runner, config);
    orchestrator.run(&ctx, &mut ledger).await;

    Ok(reporter::summarize(&mut ledger))
}
