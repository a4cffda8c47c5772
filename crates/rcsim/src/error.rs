//! Error types for the rcsim crate.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for rcsim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing, running or decoding a sweep.
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be opened, read or written.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// ngspice is not installed or not found in PATH.
    #[error("ngspice not found: {0}")]
    SimulatorNotFound(String),

    /// ngspice ran but reported failure for one iteration.
    #[error("ngspice failed for row_in2={row_in2}: {reason}")]
    SimulatorFailed { row_in2: usize, reason: String },

    /// The sweep was cancelled by the user.
    #[error("interrupted by user")]
    Interrupted,

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Read/write rows are out of range or collide.
    #[error(
        "invalid row selection (row_in1={row_in1}, row_in2={row_in2}, row_out={row_out}) for {rows} rows"
    )]
    InvalidRowSelection {
        row_in1: usize,
        row_in2: usize,
        row_out: usize,
        rows: usize,
    },

    /// Pattern dimensions do not match the array geometry.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Log decoder pattern failed to compile.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Wrap an IO error with the path it happened on.
    pub fn file_access(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::FileAccess {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
