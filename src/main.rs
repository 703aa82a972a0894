//! file_cache - inspect and manage two-tier caches from the command line
//!
//! Values are read and written as JSON. Exit status is 0 on success, 1 when `get`
//! misses and 2 for invalid arguments.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_cache::cli::{execute, Cli, Outcome};

/// Installs a stderr tracing subscriber so stdout only carries command output
///
/// Defaults to "file_cache=debug" with `--verbose` and "warn" otherwise; RUST_LOG
/// overrides both.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "file_cache=debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli).await {
        Ok(Outcome::Value(value)) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Miss(key)) => {
            eprintln!("No cached value for '{key}'");
            ExitCode::from(1)
        }
        Ok(Outcome::Present(present)) => {
            println!("{present}");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Cleaned(report)) => {
            println!(
                "Removed {} expired memory entries and {} files",
                report.memory_evicted, report.files_removed
            );
            ExitCode::SUCCESS
        }
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}
