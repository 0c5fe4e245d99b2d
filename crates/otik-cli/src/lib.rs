//! Command-line front end for OTIK archives.
//!
//! The crate is a thin layer over [`otik_formats`]:
//! - `config`: clap argument definitions
//! - `commands`: `pack`, `unpack`, `info` and `verify`
//! - `error`: CLI error type
//!
//! # Example
//!
//! ```no_run
//! use otik_cli::{Cli, commands};
//!
//! fn main() -> anyhow::Result<()> {
//!     let cli = Cli::from_args();
//!     let ok = commands::run(&cli.command, &mut std::io::stdout())?;
//!     std::process::exit(if ok { 0 } else { 1 });
//! }
//! ```

#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod error;

pub use config::{Cli, Command};
pub use error::{CliError, CliResult};
