//! tgz - extraction of gzip-compressed tar archives
//!
//! This library expands a `.tar.gz` archive either into a destination
//! directory or, for archives holding exactly one file, onto a single
//! destination path. It is the decompression step an archive-fetching layer
//! calls once it has a local copy of the source.

pub mod archive;
pub mod config;
pub mod error;
pub mod nodes;

pub use error::{Error, Result};

// Re-export commonly used types
pub use archive::{
    decompress, inspect, ArchiveEntry, Decompressor, EntryKind, ExtractMode, ExtractRequest,
    TarGzipDecompressor,
};
pub use config::{DeviceNodePolicy, ExtractConfig};
pub use nodes::{make_dev, DeviceKind, NativeNodes, NodeFactory, UnsupportedNodes};
