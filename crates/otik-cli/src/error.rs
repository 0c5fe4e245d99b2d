//! Error types for the command-line tool.

use otik_formats::archive::ArchiveError;
use otik_formats::pipeline::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by `otik` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file could not be read
    #[error("Failed to read {path}: {source}")]
    ReadInput {
        /// Input path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An extracted file or directory could not be written
    #[error("Failed to write {path}: {source}")]
    WriteOutput {
        /// Output path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Every input was missing
    #[error("No input files could be packed")]
    NoInputs,

    /// An input file name cannot be stored as a UTF-8 entry name
    #[error("Input file name is not valid UTF-8: {}", .0.display())]
    InvalidInputName(PathBuf),

    /// An entry name would escape the output directory
    #[error("Refusing to extract unsafe entry name '{0}'")]
    UnsafeEntryName(String),

    /// Archive read or write failed
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Encoding or decoding failed
    #[error("Codec error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Writing to the report stream failed
    #[error("Output error: {0}")]
    Report(#[from] std::io::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
