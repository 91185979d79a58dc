//! Creation of special files (FIFOs and device nodes)
//!
//! Special files need platform syscalls, so extraction goes through the
//! [`NodeFactory`] capability. [`NativeNodes`] uses `mkfifo`/`mknod` on Unix
//! and falls back to [`UnsupportedNodes`] elsewhere.

use std::io;
use std::path::Path;

/// Kind of device node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Block device (`S_IFBLK`)
    Block,
    /// Character device (`S_IFCHR`)
    Char,
}

/// Platform capability for creating special files
pub trait NodeFactory: Send + Sync {
    /// Create a named pipe at `path` with permission bits `mode`
    fn make_fifo(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Create a device node at `path`; `dev` is an identifier from [`make_dev`]
    fn make_device(&self, path: &Path, kind: DeviceKind, mode: u32, dev: u64) -> io::Result<()>;
}

/// Pack a major/minor pair into a device identifier.
///
/// Uses the glibc `makedev(3)` layout: the low byte of `minor` in bits 0-7,
/// the low 12 bits of `major` in bits 8-19, the rest of `minor` from bit 20
/// and the rest of `major` from bit 32.
pub fn make_dev(major: u64, minor: u64) -> u64 {
    (minor & 0xff) | ((major & 0xfff) << 8) | ((minor & !0xff) << 12) | ((major & !0xfff) << 32)
}

/// Node factory that refuses every request
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedNodes;

impl NodeFactory for UnsupportedNodes {
    fn make_fifo(&self, path: &Path, _mode: u32) -> io::Result<()> {
        Err(unsupported("FIFO", path))
    }

    fn make_device(&self, path: &Path, _kind: DeviceKind, _mode: u32, _dev: u64) -> io::Result<()> {
        Err(unsupported("device node", path))
    }
}

fn unsupported(what: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} creation not supported on this platform: {:?}", what, path),
    )
}

/// Node factory backed by the host's syscalls
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeNodes;

#[cfg(unix)]
impl NodeFactory for NativeNodes {
    fn make_fifo(&self, path: &Path, mode: u32) -> io::Result<()> {
        let c_path = c_path(path)?;
        // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
        let ret = unsafe { libc::mkfifo(c_path.as_ptr(), (mode & 0o7777) as libc::mode_t) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn make_device(&self, path: &Path, kind: DeviceKind, mode: u32, dev: u64) -> io::Result<()> {
        let c_path = c_path(path)?;
        let file_type = match kind {
            DeviceKind::Block => libc::S_IFBLK,
            DeviceKind::Char => libc::S_IFCHR,
        };
        let mode = (mode & 0o7777) as libc::mode_t | file_type;
        // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
        let ret = unsafe { libc::mknod(c_path.as_ptr(), mode, dev as libc::dev_t) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(unix))]
impl NodeFactory for NativeNodes {
    fn make_fifo(&self, path: &Path, mode: u32) -> io::Result<()> {
        UnsupportedNodes.make_fifo(path, mode)
    }

    fn make_device(&self, path: &Path, kind: DeviceKind, mode: u32, dev: u64) -> io::Result<()> {
        UnsupportedNodes.make_device(path, kind, mode, dev)
    }
}

#[cfg(unix)]
fn c_path(path: &Path) -> io::Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;

    std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_make_dev_small_numbers() {
        assert_eq!(make_dev(0, 0), 0);
        assert_eq!(make_dev(8, 1), 0x801);
        assert_eq!(make_dev(1, 3), 0x103);
        assert_eq!(make_dev(0xfff, 0xff), 0xfffff);
    }

    #[test]
    fn test_make_dev_high_bits() {
        // minor 0x56789 spills into bits 20+, major 0x1234 into bits 32+
        assert_eq!(make_dev(0x1234, 0x56789), 0x1000_5672_3489);
        assert_eq!(make_dev(0, 0x100), 0x100000);
        assert_eq!(make_dev(0x1000, 0), 0x1000_0000_0000);
    }

    #[test]
    fn test_unsupported_nodes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipe");

        let err = UnsupportedNodes.make_fifo(&path, 0o644).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);

        let err = UnsupportedNodes
            .make_device(&path, DeviceKind::Char, 0o644, make_dev(1, 3))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_native_fifo() {
        use std::os::unix::fs::{FileTypeExt, PermissionsExt};

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipe");

        NativeNodes.make_fifo(&path, 0o600).unwrap();

        let metadata = std::fs::symlink_metadata(&path).unwrap();
        assert!(metadata.file_type().is_fifo());
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);

        // Existing path is an error
        assert!(NativeNodes.make_fifo(&path, 0o600).is_err());
    }
}
