//! Settle CLI - settle command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod input;
mod util;

/// Settle - debounce a stream of values typed on stdin
#[derive(Parser)]
#[command(name = "settle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read values from stdin and print them as they settle
    ///
    /// Each line sets the live value. `:reset <value>` sets both values at
    /// once, `:quit` exits.
    Run {
        /// Quiescence window in milliseconds (overrides the config file)
        #[arg(long, allow_negative_numbers = true)]
        delay_ms: Option<i64>,

        /// Initial value
        #[arg(long, default_value = "")]
        initial: String,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout carries values, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { delay_ms, initial } => {
            cmd::run::run(cli.config.as_deref(), delay_ms, initial).await
        }
        Commands::Config => cmd::config::run(cli.config.as_deref()).await,
    }
}
