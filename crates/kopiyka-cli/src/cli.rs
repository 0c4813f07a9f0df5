//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kopiyka - Import and categorize Ukrainian bank statements
#[derive(Parser)]
#[command(name = "kopiyka")]
#[command(about = "Bank statement importer for Ukrainian banks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Rules file (defaults to ~/.config/kopiyka/rules.toml, then built-in rules)
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a CSV or PDF statement and print the result as JSON
    Parse {
        /// Statement file
        file: PathBuf,

        /// User id stamped on every row
        #[arg(short, long, default_value = "local")]
        user: String,

        /// JSON file with the user's categories: [{"id", "name", "type"}]
        #[arg(short, long)]
        categories: Option<PathBuf>,

        /// Give up on a statement after this many seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },

    /// Detect the bank that produced a statement
    Detect {
        /// Statement file
        file: PathBuf,
    },

    /// Categorize a single transaction description
    Categorize {
        /// Transaction description
        description: String,

        /// Merchant category code
        #[arg(short, long, default_value = "")]
        mcc: String,

        /// Signed amount (negative = debit); enables sign correction
        #[arg(short, long, allow_negative_numbers = true)]
        amount: Option<f64>,

        /// Use the PDF sign-aware rules instead of CSV sign correction
        #[arg(long, requires = "amount")]
        pdf: bool,
    },
}
