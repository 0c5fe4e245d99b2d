//! Command-line configuration.
//!
//! Every option is a CLI flag; the only environment variable consulted is
//! `RUST_LOG`, and only by the logging setup in the binary.
//!
//! # Example
//!
//! ```
//! use clap::Parser;
//! use otik_cli::config::{Cli, Command};
//!
//! let cli = Cli::parse_from(["otik", "pack", "-i", "a.txt", "-o", "out.otik", "--huffman"]);
//! match cli.command {
//!     Command::Pack(args) => assert!(args.huffman),
//!     _ => unreachable!(),
//! }
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use otik_formats::archive::{ByteOrder, CodecFlags};
use otik_formats::hamming::CorrectionScheme;
use otik_formats::pipeline::{EncodeOptions, HammingOptions};
use std::path::PathBuf;

/// Top-level arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "otik",
    about = "Pack and unpack OTIK archives with Huffman compression and Hamming correction",
    version
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse from the process arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Default log filter when `RUST_LOG` is unset.
    #[must_use]
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Pack files into an archive
    Pack(PackArgs),
    /// Extract every entry of an archive
    Unpack(UnpackArgs),
    /// Print header fields and entry metadata
    Info(InspectArgs),
    /// Check the data-section checksum
    Verify(InspectArgs),
}

/// Byte order selector for new archives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ByteOrderArg {
    /// Little-endian
    #[default]
    Little,
    /// Big-endian
    Big,
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(value: ByteOrderArg) -> Self {
        match value {
            ByteOrderArg::Little => Self::Little,
            ByteOrderArg::Big => Self::Big,
        }
    }
}

/// Arguments for `pack`.
#[derive(Debug, Clone, Args)]
pub struct PackArgs {
    /// Files to pack
    #[arg(short, long, num_args = 1.., required = true)]
    pub input: Vec<PathBuf>,

    /// Archive to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Byte order of the archive's integer fields
    #[arg(long, value_enum, default_value_t = ByteOrderArg::Little, alias = "bytes-order")]
    pub byte_order: ByteOrderArg,

    /// Compress entries with the archive-wide Huffman code
    #[arg(long)]
    pub huffman: bool,

    /// Protect entries with a Hamming code
    #[arg(long)]
    pub hamming: bool,

    /// Hamming control bits (block length 2^r - 1)
    #[arg(long = "r", default_value_t = 4, value_parser = clap::value_parser!(u8).range(2..=10))]
    pub control_bits: u8,

    /// Use the extended (SECDED) Hamming code
    #[arg(long, requires = "hamming")]
    pub secded: bool,

    /// Set the SHA-256 flag bit
    #[arg(long)]
    pub sha256: bool,

    /// Print per-entry sizes and ratios
    #[arg(long)]
    pub stats: bool,
}

impl PackArgs {
    /// Codec options applied to every input.
    #[must_use]
    pub fn encode_options(&self) -> EncodeOptions {
        let hamming = self.hamming.then(|| HammingOptions {
            control_bits: self.control_bits,
            scheme: if self.secded {
                CorrectionScheme::Extended
            } else {
                CorrectionScheme::Classical
            },
        });
        EncodeOptions::new().huffman(self.huffman).hamming(hamming)
    }

    /// Archive-level flag bits requested on the command line.
    ///
    /// CRC32 is always set by the writer and is not requested here.
    #[must_use]
    pub fn archive_flags(&self) -> u32 {
        let mut flags = CodecFlags::default();
        flags.toggle(CodecFlags::SHA256, self.sha256);
        flags.value
    }
}

/// Arguments for `unpack`.
#[derive(Debug, Clone, Args)]
pub struct UnpackArgs {
    /// Archive to read
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory to extract into
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for `info` and `verify`.
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Archive to read
    #[arg(short, long)]
    pub input: PathBuf,
}
