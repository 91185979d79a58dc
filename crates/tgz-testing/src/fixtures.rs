//! Archive fixtures for tgz testing

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};

/// Builds `.tar.gz` archives entry by entry, including entry types that
/// `tar::Builder` cannot take from a real filesystem (FIFOs, devices,
/// hand-written names).
pub struct ArchiveBuilder {
    builder: Builder<Vec<u8>>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    /// Start an empty archive
    pub fn new() -> Self {
        Self {
            builder: Builder::new(Vec::new()),
        }
    }

    /// Add a regular file
    pub fn file(self, name: &str, mode: u32, contents: &[u8]) -> Result<Self> {
        self.data_entry(name, EntryType::Regular, mode, contents)
    }

    /// Add a directory
    pub fn dir(self, name: &str, mode: u32) -> Result<Self> {
        self.data_entry(name, EntryType::Directory, mode, &[])
    }

    /// Add a symbolic link; long targets get a GNU long-link record
    pub fn symlink(mut self, name: &str, target: &str) -> Result<Self> {
        let mut header = header(EntryType::Symlink, 0o777, 0);
        self.builder
            .append_link(&mut header, name, target)
            .with_context(|| format!("Failed to add symlink {}", name))?;
        Ok(self)
    }

    /// Add a hard link entry
    pub fn hardlink(mut self, name: &str, target: &str) -> Result<Self> {
        let mut header = header(EntryType::Link, 0o644, 0);
        self.builder
            .append_link(&mut header, name, target)
            .with_context(|| format!("Failed to add hard link {}", name))?;
        Ok(self)
    }

    /// Add a named pipe
    pub fn fifo(self, name: &str, mode: u32) -> Result<Self> {
        self.data_entry(name, EntryType::Fifo, mode, &[])
    }

    /// Add a character device
    pub fn char_device(self, name: &str, mode: u32, major: u32, minor: u32) -> Result<Self> {
        self.device(name, EntryType::Char, mode, major, minor)
    }

    /// Add a block device
    pub fn block_device(self, name: &str, mode: u32, major: u32, minor: u32) -> Result<Self> {
        self.device(name, EntryType::Block, mode, major, minor)
    }

    /// Add an entry with an arbitrary type byte
    pub fn typed(self, name: &str, type_byte: u8, contents: &[u8]) -> Result<Self> {
        self.data_entry(name, EntryType::new(type_byte), 0o644, contents)
    }

    /// Add an entry whose name and type byte are written verbatim, bypassing
    /// the path checks of `tar::Header::set_path`
    pub fn raw(mut self, name: &[u8], type_byte: u8, mode: u32, contents: &[u8]) -> Result<Self> {
        let mut header = header(EntryType::Regular, mode, contents.len() as u64);
        {
            let old = header.as_old_mut();
            anyhow::ensure!(name.len() <= old.name.len(), "raw name too long");
            old.name = [0; 100];
            old.name[..name.len()].copy_from_slice(name);
            old.linkflag = [type_byte];
        }
        header.set_cksum();
        self.builder.append(&header, contents)?;
        Ok(self)
    }

    /// Finish the tar stream without compressing it
    pub fn into_tar(self) -> Result<Vec<u8>> {
        Ok(self.builder.into_inner()?)
    }

    /// Finish the tar stream and gzip it
    pub fn into_gz(self) -> Result<Vec<u8>> {
        gzip(&self.into_tar()?)
    }

    /// Finish the archive and write it to `path`
    pub fn write_to(self, path: &Path) -> Result<PathBuf> {
        let bytes = self.into_gz()?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path.to_path_buf())
    }

    fn data_entry(
        mut self,
        name: &str,
        entry_type: EntryType,
        mode: u32,
        contents: &[u8],
    ) -> Result<Self> {
        let mut header = header(entry_type, mode, contents.len() as u64);
        self.builder
            .append_data(&mut header, name, contents)
            .with_context(|| format!("Failed to add {}", name))?;
        Ok(self)
    }

    fn device(
        mut self,
        name: &str,
        entry_type: EntryType,
        mode: u32,
        major: u32,
        minor: u32,
    ) -> Result<Self> {
        let mut header = header(entry_type, mode, 0);
        header.set_device_major(major)?;
        header.set_device_minor(minor)?;
        self.builder
            .append_data(&mut header, name, std::io::empty())
            .with_context(|| format!("Failed to add device {}", name))?;
        Ok(self)
    }
}

fn header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

/// Gzip arbitrary bytes
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Pack `source_dir` into a `.tar.gz` at `archive_path`, storing it under
/// the top-level name `root`. Symlinks are stored as links.
pub fn pack_dir(source_dir: &Path, root: &str, archive_path: &Path) -> Result<()> {
    let file = fs::File::create(archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(root, source_dir)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Standard tree used by round-trip tests
pub fn create_test_tree(dir: &crate::TestDir) -> Result<()> {
    dir.create_file("file1.txt", b"This is file 1 content.")?;
    dir.create_file("file2.txt", b"This is file 2 content.")?;
    dir.create_dir("subdir")?;
    dir.create_file("subdir/file3.txt", b"This is file 3 in subdir.")?;
    dir.create_dir("empty")?;
    dir.create_file("image.jpg", &[0xFF, 0xD8, 0xFF, 0xE0])?;

    let large_content = "x".repeat(256 * 1024);
    dir.create_file("large.log", large_content.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;
        symlink("file1.txt", dir.path().join("link_to_file1.txt"))?;
        symlink("../file2.txt", dir.path().join("subdir/link_to_parent_file.txt"))?;
    }

    Ok(())
}
