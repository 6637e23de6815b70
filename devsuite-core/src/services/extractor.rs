//! Archive extraction for the JDK and CDK bundles.
//!
//! Zip and tar archives go through the same entry handling: every entry
//! path is checked against the destination root before anything is
//! written, links are never materialized, and executable bits survive on
//! Unix. [`ArchiveUnpacker`] runs the blocking work on tokio's blocking
//! pool.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::installables::ArchiveFormat;

/// Unpacks a downloaded archive into a directory.
#[async_trait]
pub trait Unpacker: Send + Sync {
    /// Extracts `archive` into `dest_dir` and returns the directory written to.
    async fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<PathBuf>;
}

/// [`Unpacker`] that picks the format from the archive's file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveUnpacker;

#[async_trait]
impl Unpacker for ArchiveUnpacker {
    async fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let Some(format) = ArchiveFormat::from_path(archive) else {
            bail!("Unknown archive format: {}", archive.display());
        };
        if !format.requires_extraction() {
            bail!("{} is an installer, not an archive", archive.display());
        }

        let archive = archive.to_path_buf();
        let dest = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let written = extract_archive(&archive, &dest, format)?;
            debug!("{} entries written to {}", written, dest.display());
            Ok(dest)
        })
        .await
        .context("Extraction task panicked")?
    }
}

/// Extract `archive_path` into `dest_dir`; returns the number of entries
/// written. Unsafe entries are skipped with a warning.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path, format: ArchiveFormat) -> Result<usize> {
    info!("Extracting {} into {}", archive_path.display(), dest_dir.display());

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let reader = BufReader::new(file);

    let mut sink = EntrySink::new(dest_dir);
    match format {
        ArchiveFormat::Zip => unpack_zip(reader, &mut sink),
        ArchiveFormat::TarGz => unpack_tar(flate2::read::GzDecoder::new(reader), &mut sink),
        ArchiveFormat::TarXz => unpack_tar(xz2::read::XzDecoder::new(reader), &mut sink),
        ArchiveFormat::Executable | ArchiveFormat::Msi => {
            bail!("{} is an installer, not an archive", archive_path.display())
        }
    }
    .with_context(|| format!("Failed to extract {}", archive_path.display()))?;

    Ok(sink.written)
}

// ============================================================================
// Entry Handling
// ============================================================================

/// Writes archive entries below a fixed root.
struct EntrySink<'a> {
    root: &'a Path,
    written: usize,
}

impl<'a> EntrySink<'a> {
    fn new(root: &'a Path) -> Self {
        Self { root, written: 0 }
    }

    /// Destination of `entry`, or `None` if it would leave the root.
    fn resolve(&self, entry: &Path) -> Option<PathBuf> {
        let mut relative = PathBuf::new();
        for component in entry.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        (!relative.as_os_str().is_empty()).then(|| self.root.join(relative))
    }

    fn dir(&mut self, entry: &Path) -> Result<()> {
        let Some(path) = self.resolve(entry) else {
            warn!("Skipping unsafe archive path {}", entry.display());
            return Ok(());
        };
        fs::create_dir_all(&path)?;
        self.written += 1;
        Ok(())
    }

    fn file(&mut self, entry: &Path, content: &mut dyn Read, mode: Option<u32>) -> Result<()> {
        let Some(path) = self.resolve(entry) else {
            warn!("Skipping unsafe archive path {}", entry.display());
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&path)
            .with_context(|| format!("Failed to create: {}", path.display()))?;
        io::copy(content, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = mode.filter(|m| m & 0o111 != 0) {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(mode | 0o755))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        self.written += 1;
        Ok(())
    }
}

fn unpack_zip<R: Read + io::Seek>(reader: R, sink: &mut EntrySink<'_>) -> Result<()> {
    let mut archive = zip::ZipArchive::new(reader)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = PathBuf::from(entry.name());
        if entry.is_dir() {
            sink.dir(&name)?;
        } else {
            let mode = entry.unix_mode();
            sink.file(&name, &mut entry, mode)?;
        }
    }
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, sink: &mut EntrySink<'_>) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        let name = entry.path()?.into_owned();

        if kind.is_dir() {
            sink.dir(&name)?;
        } else if kind.is_file() {
            let mode = entry.header().mode().ok();
            sink.file(&name, &mut entry, mode)?;
        } else {
            // Links could point anywhere; nothing in the bundles needs them
            warn!("Skipping {:?} entry {}", kind, name.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn tar_entry<W: Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8], mode: u32) {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    #[test]
    fn test_zulu_zip() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("zulu8.zip");
        let out = dir.path().join("install");
        write_zip(
            &archive,
            &[
                ("zulu8.40.0.25-jdk8.0.212/release", b"JAVA_VERSION=\"1.8.0_212\""),
                ("zulu8.40.0.25-jdk8.0.212/bin/java", b"#!/bin/sh"),
            ],
        );

        let written = extract_archive(&archive, &out, ArchiveFormat::Zip).unwrap();

        assert_eq!(written, 2);
        let root = out.join("zulu8.40.0.25-jdk8.0.212");
        assert_eq!(
            fs::read_to_string(root.join("release")).unwrap(),
            "JAVA_VERSION=\"1.8.0_212\""
        );
        assert!(root.join("bin").join("java").is_file());
    }

    #[test]
    fn test_zip_traversal_skipped() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.zip");
        let out = dir.path().join("install");
        write_zip(&archive, &[("../outside.txt", b"x"), ("cdk/README", b"ok")]);

        let written = extract_archive(&archive, &out, ArchiveFormat::Zip).unwrap();

        assert_eq!(written, 1);
        assert!(!dir.path().join("outside.txt").exists());
        assert!(out.join("cdk").join("README").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_gz_keeps_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("cdk.tar.gz");
        let out = dir.path().join("install");
        {
            let encoder = flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(encoder);
            tar_entry(&mut builder, "cdk/plugins/landrush.gem", b"gem", 0o644);
            tar_entry(&mut builder, "cdk/bin/setup.sh", b"#!/bin/sh", 0o755);
            builder.into_inner().unwrap().finish().unwrap();
        }

        extract_archive(&archive, &out, ArchiveFormat::TarGz).unwrap();

        assert_eq!(fs::read_to_string(out.join("cdk/plugins/landrush.gem")).unwrap(), "gem");
        let mode = fs::metadata(out.join("cdk/bin/setup.sh")).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_tar_xz() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("jdk8.tar.xz");
        let out = dir.path().join("install");
        {
            let mut builder = tar::Builder::new(xz2::write::XzEncoder::new(File::create(&archive).unwrap(), 6));
            tar_entry(&mut builder, "zulu8/release", b"8", 0o644);
            builder.into_inner().unwrap().finish().unwrap();
        }

        extract_archive(&archive, &out, ArchiveFormat::TarXz).unwrap();

        assert_eq!(fs::read_to_string(out.join("zulu8/release")).unwrap(), "8");
    }

    #[test]
    fn test_tar_symlink_not_followed() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.tar.gz");
        let out = dir.path().join("install");
        {
            let encoder = flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(encoder);
            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_size(0);
            link.set_mode(0o777);
            builder.append_link(&mut link, "escape", "../escaped.txt").unwrap();
            tar_entry(&mut builder, "escape", b"payload", 0o644);
            builder.into_inner().unwrap().finish().unwrap();
        }

        extract_archive(&archive, &out, ArchiveFormat::TarGz).unwrap();

        assert!(!dir.path().join("escaped.txt").exists());
        assert_eq!(fs::read_to_string(out.join("escape")).unwrap(), "payload");
    }

    #[test]
    fn test_installers_are_not_extracted() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("vagrant.msi");
        fs::write(&archive, b"msi").unwrap();

        assert!(extract_archive(&archive, dir.path(), ArchiveFormat::Msi).is_err());
    }

    #[tokio::test]
    async fn test_unpacker_picks_format_from_name() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bundle.zip");
        let out = dir.path().join("out");
        write_zip(&archive, &[("hello.txt", b"Hello")]);

        assert_eq!(ArchiveUnpacker.unpack(&archive, &out).await.unwrap(), out);
        assert!(out.join("hello.txt").exists());

        let msi = dir.path().join("vagrant_1.7.4.msi");
        fs::write(&msi, b"msi").unwrap();
        assert!(ArchiveUnpacker.unpack(&msi, &out).await.is_err());

        let rar = dir.path().join("bundle.rar");
        fs::write(&rar, b"rar").unwrap();
        assert!(ArchiveUnpacker.unpack(&rar, &out).await.is_err());
    }
}
