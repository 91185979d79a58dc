//! Setup and structural error tests

use std::fs;
use tgz_core::{decompress, inspect, Error};
use tgz_testing::fixtures::gzip;
use tgz_testing::{ArchiveBuilder, TestDir};

#[test]
fn test_empty_archive_directory_mode() -> anyhow::Result<()> {
    let temp_dir = TestDir::new()?;
    let archive = ArchiveBuilder::new().write_to(&temp_dir.join("empty.tgz"))?;

    let err = decompress(temp_dir.join("out"), &archive, true).unwrap_err();

    assert!(matches!(err, Error::EmptyArchive(_)), "got {:?}", err);
    assert!(err.to_string().contains("empty archive"));
    assert!(err.to_string().contains("empty.tgz"));
    Ok(())
}

#[test]
fn test_empty_archive_single_file_mode() -> anyhow::Result<()> {
    let temp_dir = TestDir::new()?;
    let archive = ArchiveBuilder::new().write_to(&temp_dir.join("empty.tgz"))?;

    let err = decompress(temp_dir.join("out.txt"), &archive, false).unwrap_err();

    assert!(matches!(err, Error::EmptyArchive(_)), "got {:?}", err);
    Ok(())
}

#[test]
fn test_empty_gzip_payload() -> anyhow::Result<()> {
    let temp_dir = TestDir::new()?;
    let archive = temp_dir.join("nothing.tgz");
    fs::write(&archive, gzip(&[])?)?;

    let err = decompress(temp_dir.join("out"), &archive, true).unwrap_err();

    assert!(matches!(err, Error::EmptyArchive(_)), "got {:?}", err);
    Ok(())
}

#[test]
fn test_missing_source() -> anyhow::Result<()> {
    let temp_dir = TestDir::new()?;
    let missing = temp_dir.join("missing.tgz");

    let err = decompress(temp_dir.join("out"), &missing, true).unwrap_err();

    match err {
        Error::Open { path, source } => {
            assert_eq!(path, missing);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_not_gzip() -> anyhow::Result<()> {
    let temp_dir = TestDir::new()?;
    let archive = temp_dir.create_file("plain.tgz", b"this is plain text, not gzip data")?;

    let err = decompress(temp_dir.join("out"), &archive, true).unwrap_err();

    assert!(matches!(err, Error::Gzip { .. }), "got {:?}", err);
    assert!(err.to_string().contains("plain.tgz"));
    // The destination is prepared before the source is read
    assert!(temp_dir.join("out").is_dir());
    Ok(())
}

#[test]
fn test_corrupt_tar_stream() -> anyhow::Result<()> {
    let temp_dir = TestDir::new()?;
    let archive = temp_dir.join("corrupt.tgz");
    fs::write(&archive, gzip(&[b'x'; 1024])?)?;

    let err = decompress(temp_dir.join("out"), &archive, true).unwrap_err();
    assert!(matches!(err, Error::Corrupt { .. }), "got {:?}", err);

    let err = inspect(&archive).unwrap_err();
    assert!(matches!(err, Error::Corrupt { .. }), "got {:?}", err);
    Ok(())
}

#[test]
fn test_corruption_after_valid_entries_keeps_written_files() -> anyhow::Result<()> {
    let temp_dir = TestDir::new()?;
    let valid = ArchiveBuilder::new()
        .file("first.txt", 0o644, b"first")?
        .into_gz()?;

    // Re-compress the tar stream with a garbage header in place of the end
    // marker
    let mut tar = Vec::new();
    {
        use std::io::Read;
        flate2::read::GzDecoder::new(&valid[..]).read_to_end(&mut tar)?;
    }
    let end = tar.len() - 1024;
    tar.truncate(end);
    tar.extend_from_slice(&[b'x'; 512]);
    let archive = temp_dir.join("partial.tgz");
    fs::write(&archive, gzip(&tar)?)?;
    let dest = temp_dir.join("out");

    let err = decompress(&dest, &archive, true).unwrap_err();

    assert!(matches!(err, Error::Corrupt { .. }), "got {:?}", err);
    assert_eq!(fs::read(dest.join("first.txt"))?, b"first");
    Ok(())
}
