//! Archive entry model

use std::io::{self, Read};
use std::path::PathBuf;
use tar::EntryType;
use tracing::debug;

/// Kind of a tar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Directory (`'5'`, or a legacy NUL-typed entry whose name ends in `/`)
    Directory,
    /// Regular file (`'0'`, NUL, contiguous `'7'`)
    Regular,
    /// Symbolic link (`'2'`)
    Symlink,
    /// Hard link (`'1'`)
    HardLink,
    /// GNU long name record (`'L'`) surfaced as an entry
    LongName,
    /// GNU long link record (`'K'`) surfaced as an entry
    LongLink,
    /// Named pipe (`'6'`)
    Fifo,
    /// Block device (`'4'`)
    BlockDevice,
    /// Character device (`'3'`)
    CharDevice,
    /// GNU sparse file (`'S'`)
    Sparse,
    /// Anything else, with its raw type byte
    Other(u8),
}

impl EntryKind {
    /// Classify a raw tar type byte. `name_is_dir` marks a stored name ending
    /// in `/`, which turns a legacy NUL-typed entry into a directory.
    pub fn classify(type_byte: u8, name_is_dir: bool) -> Self {
        if type_byte == b'\0' && name_is_dir {
            return EntryKind::Directory;
        }

        match EntryType::new(type_byte) {
            EntryType::Directory => EntryKind::Directory,
            EntryType::Regular | EntryType::Continuous => EntryKind::Regular,
            EntryType::Symlink => EntryKind::Symlink,
            EntryType::Link => EntryKind::HardLink,
            EntryType::GNULongName => EntryKind::LongName,
            EntryType::GNULongLink => EntryKind::LongLink,
            EntryType::Fifo => EntryKind::Fifo,
            EntryType::Block => EntryKind::BlockDevice,
            EntryType::Char => EntryKind::CharDevice,
            EntryType::GNUSparse => EntryKind::Sparse,
            other => EntryKind::Other(other.as_byte()),
        }
    }

    /// Whether the entry's payload is written out as a regular file
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            EntryKind::Regular | EntryKind::LongName | EntryKind::HardLink | EntryKind::Sparse
        )
    }
}

/// Entry in an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path within the archive (relative to archive root)
    pub path: PathBuf,
    /// Entry kind
    pub kind: EntryKind,
    /// Permission bits from the header
    pub mode: u32,
    /// Payload size in bytes
    pub size: u64,
    /// Link target (for symlinks and hard links)
    pub link_target: Option<PathBuf>,
    /// Device major number (for device nodes)
    pub dev_major: Option<u32>,
    /// Device minor number (for device nodes)
    pub dev_minor: Option<u32>,
}

impl ArchiveEntry {
    /// Build the model from a tar entry. Long names, long link targets and
    /// PAX paths are already resolved by the tar reader.
    pub fn from_tar<R: Read>(entry: &tar::Entry<'_, R>) -> io::Result<Self> {
        let header = entry.header();
        let name_is_dir = entry.path_bytes().ends_with(b"/");
        let kind = EntryKind::classify(header.as_old().linkflag[0], name_is_dir);

        let (dev_major, dev_minor) = match kind {
            EntryKind::BlockDevice | EntryKind::CharDevice => (
                lenient_number(header.device_major(), "device major"),
                lenient_number(header.device_minor(), "device minor"),
            ),
            _ => (None, None),
        };

        Ok(Self {
            path: entry.path()?.into_owned(),
            kind,
            mode: header.mode()? & 0o7777,
            size: header.size()?,
            link_target: entry.link_name()?.map(|p| p.into_owned()),
            dev_major,
            dev_minor,
        })
    }
}

/// Device numbers are often left blank by archivers; a field that does not
/// parse reads as absent instead of failing the entry.
fn lenient_number(field: io::Result<Option<u32>>, what: &str) -> Option<u32> {
    field.unwrap_or_else(|e| {
        debug!("Unreadable {} field, treating as 0: {}", what, e);
        None
    })
}
