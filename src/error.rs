//! Error types for the comparison engine

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The comparator operates on exactly two inputs.
    #[error("exactly {expected} input sources are required, {actual} given")]
    InputCount { expected: usize, actual: usize },

    #[error("invalid input '{spec}': {reason}")]
    InvalidInput { spec: String, reason: String },

    #[error("buffer-packets must be at least {min}, got {got}")]
    BufferTooSmall { min: usize, got: usize },

    #[error("max-input-packets must be at least 1")]
    MaxInputPacketsZero,

    #[error("cannot create output file '{}': {source}", path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open input '{name}': {source}")]
    SourceOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("input {index}: cannot start executor thread")]
    ExecutorStart { index: usize },

    #[error("comparator already started")]
    AlreadyStarted,

    #[error(transparent)]
    Io(#[from] io::Error),
}
