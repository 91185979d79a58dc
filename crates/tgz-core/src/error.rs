//! Error types for tgz-core

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the tgz library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed while materializing an entry
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The source archive could not be opened
    #[error("Error opening archive {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source is not a valid gzip stream
    #[error("Error opening a gzip reader for {path:?}: {source}")]
    Gzip {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tar stream inside the gzip stream is corrupt
    #[error("Corrupt tar stream in {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No entry was materialized
    #[error("empty archive: {0:?}")]
    EmptyArchive(PathBuf),

    /// Single-file extraction found a second entry
    #[error("expected a single file, got multiple: {0:?}")]
    MultipleFiles(PathBuf),

    /// Single-file extraction found an entry that is not a regular file
    #[error("expected a single file: {0:?}")]
    ExpectedSingleFile(PathBuf),

    /// Entry name resolves outside the destination
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
