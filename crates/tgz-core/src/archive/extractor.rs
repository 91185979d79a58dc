//! Tar.gz extractor implementation

use super::entry::{ArchiveEntry, EntryKind};
use super::{corrupt, Decompressor, ExtractMode, ExtractRequest};
use crate::config::{DeviceNodePolicy, ExtractConfig};
use crate::nodes::{make_dev, DeviceKind, NativeNodes, NodeFactory};
use crate::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::{debug, error, info, warn};

/// Reader stack of an open archive: file, gzip filter, tar entries
pub(crate) type TgzArchive = Archive<BufReader<MultiGzDecoder<File>>>;

/// Extractor for gzip-compressed tar archives
pub struct TarGzipDecompressor {
    config: ExtractConfig,
    nodes: Box<dyn NodeFactory>,
}

impl Default for TarGzipDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl TarGzipDecompressor {
    /// Create an extractor with the default configuration
    pub fn new() -> Self {
        Self::with_config(ExtractConfig::default())
    }

    /// Create an extractor with the given configuration
    pub fn with_config(config: ExtractConfig) -> Self {
        Self {
            config,
            nodes: Box::new(NativeNodes),
        }
    }

    /// Create an extractor from the user's configuration file, if any
    pub fn from_user_config() -> Self {
        Self::with_config(ExtractConfig::load_or_default())
    }

    /// Replace the factory used for FIFOs and device nodes
    pub fn with_node_factory<N: NodeFactory + 'static>(mut self, nodes: N) -> Self {
        self.nodes = Box::new(nodes);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Run one extraction.
    ///
    /// Nothing is rolled back on failure: entries written before the error
    /// stay on disk.
    pub fn extract(&self, request: &ExtractRequest) -> Result<()> {
        let source = request.source.as_path();
        let destination = request.destination.as_path();

        info!(
            "Extracting {:?} to {:?} ({:?})",
            source, destination, request.mode
        );

        let prepare = match request.mode {
            ExtractMode::DirectoryExpand => Some(destination),
            ExtractMode::SingleFile => destination
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty()),
        };
        if let Some(dir) = prepare {
            create_dir_all(dir, self.config.dir_mode)?;
        }

        let mut archive = open_archive(source)?;
        let mut done = false;

        for entry in archive.entries().map_err(|e| corrupt(source, e))? {
            let mut entry = entry.map_err(|e| corrupt(source, e))?;
            let info = ArchiveEntry::from_tar(&entry).map_err(|e| corrupt(source, e))?;

            if let EntryKind::Other(byte) = info.kind {
                debug!(
                    "Skipping {:?}: unsupported entry type {:?}",
                    info.path, byte as char
                );
                continue;
            }

            let target = match request.mode {
                ExtractMode::DirectoryExpand => {
                    let target = join_entry_path(destination, &info.path)?;
                    if info.kind != EntryKind::Directory {
                        ensure_parent(&target, self.config.dir_mode)?;
                    }
                    target
                }
                ExtractMode::SingleFile => {
                    if done {
                        return Err(Error::MultipleFiles(source.to_path_buf()));
                    }
                    if !info.kind.is_data() {
                        return Err(Error::ExpectedSingleFile(source.to_path_buf()));
                    }
                    destination.to_path_buf()
                }
            };

            debug!("Extracting: {:?} ({:?})", info.path, info.kind);
            self.materialize(&info, &target, &mut entry)?;
            done = true;
        }

        if !done {
            return Err(Error::EmptyArchive(source.to_path_buf()));
        }

        info!("Successfully extracted archive");
        Ok(())
    }

    /// Create the filesystem object for one entry at `target`
    fn materialize<R: Read>(&self, info: &ArchiveEntry, target: &Path, data: &mut R) -> Result<()> {
        match info.kind {
            EntryKind::Directory => create_dir_all(target, info.mode)?,
            kind if kind.is_data() => write_file(target, info.mode, data)?,
            EntryKind::Symlink | EntryKind::LongLink => {
                let link_target = info.link_target.as_deref().unwrap_or(Path::new(""));
                if let Err(e) = create_symlink(link_target, target) {
                    warn!(
                        "Error creating symlink for {:?} -> {:?}: {}",
                        target, link_target, e
                    );
                }
            }
            EntryKind::Fifo => {
                debug!("Creating FIFO: {:?}", target);
                self.nodes.make_fifo(target, info.mode)?;
            }
            EntryKind::BlockDevice | EntryKind::CharDevice => {
                self.materialize_device(info, target, data)?
            }
            // Other entries are filtered out by the caller
            _ => {}
        }

        Ok(())
    }

    fn materialize_device<R: Read>(
        &self,
        info: &ArchiveEntry,
        target: &Path,
        data: &mut R,
    ) -> Result<()> {
        match self.config.device_nodes {
            DeviceNodePolicy::AsRegularFile => write_file(target, info.mode, data),
            DeviceNodePolicy::Create => {
                let kind = if info.kind == EntryKind::BlockDevice {
                    DeviceKind::Block
                } else {
                    DeviceKind::Char
                };
                let major = info.dev_major.unwrap_or(0);
                let minor = info.dev_minor.unwrap_or(0);
                let dev = make_dev(u64::from(major), u64::from(minor));

                debug!(
                    "Creating {:?} device: {:?} maj:{} min:{} dev:{}",
                    kind, target, major, minor, dev
                );
                self.nodes.make_device(target, kind, info.mode, dev)?;
                Ok(())
            }
        }
    }
}

impl Decompressor for TarGzipDecompressor {
    fn decompress(&self, destination: &Path, source: &Path, mode: ExtractMode) -> Result<()> {
        self.extract(&ExtractRequest::new(source, destination, mode))
    }

    fn format_name(&self) -> &'static str {
        "tar.gz"
    }
}

/// Open `source` and stack the gzip and tar readers on top of it.
///
/// Every gzip member of the source is decoded in turn. The first header is
/// read here so that a non-gzip source fails before any entry is looked at.
pub(crate) fn open_archive(source: &Path) -> Result<TgzArchive> {
    let file = File::open(source).map_err(|e| Error::Open {
        path: source.to_path_buf(),
        source: e,
    })?;

    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    reader.fill_buf().map_err(|e| Error::Gzip {
        path: source.to_path_buf(),
        source: e,
    })?;

    Ok(Archive::new(reader))
}

/// Resolve an archive-relative name under `destination`.
///
/// Root and `.` components are dropped, `..` pops the previous component and
/// may not climb above `destination`.
fn join_entry_path(destination: &Path, name: &Path) -> Result<PathBuf> {
    let mut relative = PathBuf::new();

    for component in name.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                if !relative.pop() {
                    error!(path = ?name, "Entry path escapes the destination");
                    return Err(Error::InvalidPath(format!(
                        "Path traversal attempt detected: {:?}",
                        name
                    )));
                }
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Ok(destination.to_path_buf());
    }

    Ok(destination.join(relative))
}

fn ensure_parent(target: &Path, mode: u32) -> io::Result<()> {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            create_dir_all(parent, mode)
        }
        _ => Ok(()),
    }
}

/// Recursively create `path`; existing directories are fine
fn create_dir_all(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder.create(path)
}

/// Create or truncate `path` with `mode` and copy `src` into it
fn write_file<R: Read>(path: &Path, mode: u32, src: &mut R) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path)?;
    io::copy(src, &mut file)?;

    // The open mode is filtered by the umask; the stored mode is not
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Symlink extraction not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_plain_names() {
        let dest = Path::new("/tmp/dest");
        assert_eq!(
            join_entry_path(dest, Path::new("a/b.txt")).unwrap(),
            PathBuf::from("/tmp/dest/a/b.txt")
        );
        assert_eq!(
            join_entry_path(dest, Path::new("./a/./b.txt")).unwrap(),
            PathBuf::from("/tmp/dest/a/b.txt")
        );
        assert_eq!(
            join_entry_path(dest, Path::new("dir/")).unwrap(),
            PathBuf::from("/tmp/dest/dir")
        );
    }

    #[test]
    fn test_join_absolute_name_stays_inside() {
        let dest = Path::new("/tmp/dest");
        assert_eq!(
            join_entry_path(dest, Path::new("/etc/passwd")).unwrap(),
            PathBuf::from("/tmp/dest/etc/passwd")
        );
    }

    #[test]
    fn test_join_parent_components() {
        let dest = Path::new("/tmp/dest");
        assert_eq!(
            join_entry_path(dest, Path::new("a/../b.txt")).unwrap(),
            PathBuf::from("/tmp/dest/b.txt")
        );
        assert!(matches!(
            join_entry_path(dest, Path::new("../evil.txt")),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            join_entry_path(dest, Path::new("a/../../evil.txt")),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_join_empty_name_is_destination() {
        let dest = Path::new("/tmp/dest");
        assert_eq!(
            join_entry_path(dest, Path::new("./")).unwrap(),
            PathBuf::from("/tmp/dest")
        );
    }

    #[test]
    fn test_format_name() {
        assert_eq!(TarGzipDecompressor::new().format_name(), "tar.gz");
    }
}
