//! `otik` binary entry point.
//!
//! Parses arguments, initializes logging and dispatches to the
//! otik-cli library. Exits with status 1 when a data-section checksum
//! check fails.

use anyhow::Result;
use otik_cli::{Cli, commands};

fn main() -> Result<()> {
    let cli = Cli::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let ok = commands::run(&cli.command, &mut std::io::stdout().lock())?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
