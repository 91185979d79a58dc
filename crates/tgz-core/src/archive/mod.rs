//! Archive operations module

pub mod entry;
pub mod extractor;

pub use entry::{ArchiveEntry, EntryKind};
pub use extractor::TarGzipDecompressor;

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// What the destination of an extraction is expected to become
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Reproduce the whole archive tree under the destination directory
    DirectoryExpand,
    /// The archive holds exactly one file, written to the destination path
    SingleFile,
}

impl ExtractMode {
    /// Mode for a caller that knows whether it expects a directory
    pub fn from_expect_directory(expect_directory: bool) -> Self {
        if expect_directory {
            ExtractMode::DirectoryExpand
        } else {
            ExtractMode::SingleFile
        }
    }
}

/// A single extraction job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Archive to read
    pub source: PathBuf,
    /// Directory (or file path in single-file mode) to write to
    pub destination: PathBuf,
    /// Extraction mode
    pub mode: ExtractMode,
}

impl ExtractRequest {
    /// Create a new request
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        source: P,
        destination: Q,
        mode: ExtractMode,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode,
        }
    }
}

/// Trait for archive decompressors, as seen by the layer that fetches
/// archives and decides what they should contain
pub trait Decompressor: Send + Sync {
    /// Extract `source` into `destination`
    fn decompress(&self, destination: &Path, source: &Path, mode: ExtractMode) -> Result<()>;

    /// Get the format name for this decompressor
    fn format_name(&self) -> &'static str;
}

/// Extract a `.tar.gz` archive with the default configuration.
///
/// With `expect_directory` the archive is expanded under `destination`;
/// otherwise it must hold exactly one file, which is written to
/// `destination` itself.
pub fn decompress<P: AsRef<Path>, Q: AsRef<Path>>(
    destination: P,
    source: Q,
    expect_directory: bool,
) -> Result<()> {
    TarGzipDecompressor::new().decompress(
        destination.as_ref(),
        source.as_ref(),
        ExtractMode::from_expect_directory(expect_directory),
    )
}

/// Inspect archive contents without extracting
pub fn inspect<P: AsRef<Path>>(source: P) -> Result<Vec<ArchiveEntry>> {
    let source = source.as_ref();
    info!("Inspecting archive: {:?}", source);

    let mut archive = extractor::open_archive(source)?;
    let mut entries = Vec::new();

    for entry in archive.entries().map_err(|e| corrupt(source, e))? {
        let entry = entry.map_err(|e| corrupt(source, e))?;
        entries.push(ArchiveEntry::from_tar(&entry).map_err(|e| corrupt(source, e))?);
    }

    info!("Found {} entries in archive", entries.len());
    Ok(entries)
}

pub(crate) fn corrupt(source: &Path, err: std::io::Error) -> Error {
    Error::Corrupt {
        path: source.to_path_buf(),
        source: err,
    }
}
