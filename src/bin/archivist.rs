//! Archivist CLI Binary
//!
//! Command-line interface for deposit reconciliation and import jobs.

use anyhow::Context;
use archivist::logging::init_logging;
use archivist::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

async fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = CliContext::new(cli.config.as_deref()).context("Error loading configuration")?;

    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("Error initializing logging")?;

    let output = context.execute(&cli.command).await?;
    Ok(output)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
