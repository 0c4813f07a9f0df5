//! Kopiyka CLI - Ukrainian bank statement importer
//!
//! Usage:
//!   kopiyka parse FILE                  Parse a CSV or PDF statement to JSON
//!   kopiyka detect FILE                 Show which bank produced a statement
//!   kopiyka categorize "DESCRIPTION"    Categorize one transaction description

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so JSON on stdout stays machine-readable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    commands::block_on(run(cli))?
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Parse {
            file,
            user,
            categories,
            timeout_secs,
        } => {
            commands::cmd_parse(
                cli.rules.as_deref(),
                &file,
                &user,
                categories.as_deref(),
                timeout_secs,
            )
            .await
        }
        Commands::Detect { file } => commands::cmd_detect(cli.rules.as_deref(), &file),
        Commands::Categorize {
            description,
            mcc,
            amount,
            pdf,
        } => commands::cmd_categorize(cli.rules.as_deref(), &description, &mcc, amount, pdf),
    }
}
