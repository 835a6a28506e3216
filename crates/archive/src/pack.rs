//! Archive construction.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use crate::util::{entry_name, to_zip_time};
use exn::ResultExt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind as IoErrorKind};
use std::path::Path;
use tracing::instrument;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Summary of a [`pack`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackStats {
    /// Files written into the archive.
    pub added: usize,
    /// Files that could not be read or added.
    pub skipped: usize,
    /// Uncompressed bytes written.
    pub bytes: u64,
}

/// Write every regular file below `source` into a new zip archive at `archive`.
///
/// The archive is opened with exclusive-create semantics: if `archive` exists
/// already this fails with [`ErrorKind::AlreadyExists`] and the existing file
/// is left alone. Individual files that can't be read are logged and skipped.
#[instrument(skip_all, fields(source = %source.display(), archive = %archive.display(), compression = %compression))]
pub fn pack(source: &Path, archive: &Path, compression: Compression) -> Result<PackStats> {
    if !source.is_dir() {
        exn::bail!(ErrorKind::InvalidPath(source.to_path_buf()));
    }
    let root = source.canonicalize().or_raise(|| ErrorKind::Io)?;
    let file = OpenOptions::new().write(true).create_new(true).open(archive).map_err(|e| {
        let kind = match e.kind() {
            IoErrorKind::AlreadyExists => ErrorKind::AlreadyExists(archive.to_path_buf()),
            _ => ErrorKind::Io,
        };
        exn::Exn::from(e).raise(kind)
    })?;
    let written = write_archive(file, &root, archive, compression);
    discard_on_error(archive, written)
}

fn write_archive(file: File, root: &Path, archive: &Path, compression: Compression) -> Result<PackStats> {
    // Keep the archive out of its own contents when written inside the source.
    let archive_abs = archive.canonicalize().or_raise(|| ErrorKind::Io)?;

    let mut writer = ZipWriter::new(BufWriter::new(file));
    let mut stats = PackStats::default();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable path");
                stats.skipped += 1;
                continue;
            },
        };
        if !entry.file_type().is_file() || entry.path() == archive_abs {
            continue;
        }
        let Some(name) = entry_name(root, entry.path()) else {
            tracing::warn!(path = %entry.path().display(), "skipping path without a valid entry name");
            stats.skipped += 1;
            continue;
        };
        match add_file(&mut writer, entry.path(), &name, compression) {
            Ok(size) => {
                tracing::trace!(entry = %name, size, "added");
                stats.added += 1;
                stats.bytes += size;
            },
            Err(e) => {
                tracing::warn!(entry = %name, error = ?e, "failed to add file to archive");
                stats.skipped += 1;
            },
        }
    }
    writer.finish().or_raise(|| ErrorKind::Io)?;
    tracing::info!(added = stats.added, skipped = stats.skipped, bytes = stats.bytes, "archive written");
    Ok(stats)
}

/// Remove a partially written archive so the next run isn't refused.
fn discard_on_error<T>(archive: &Path, result: Result<T>) -> Result<T> {
    if result.is_err()
        && let Err(e) = std::fs::remove_file(archive)
    {
        tracing::debug!(archive = %archive.display(), error = %e, "failed to remove partial archive");
    }
    result
}

fn add_file<W>(writer: &mut ZipWriter<W>, path: &Path, name: &str, compression: Compression) -> Result<u64>
where
    W: std::io::Write + std::io::Seek,
{
    let mut file = File::open(path).or_raise(|| ErrorKind::Io)?;
    let metadata = file.metadata().or_raise(|| ErrorKind::Io)?;
    let mut options = SimpleFileOptions::default()
        .compression_method(compression.method())
        .compression_level(compression.level())
        .large_file(metadata.len() >= ZIP64_THRESHOLD);
    if let Some(modified) = metadata.modified().ok().and_then(to_zip_time) {
        options = options.last_modified_time(modified);
    }
    writer.start_file(name, options).or_raise(|| ErrorKind::Io)?;
    match std::io::copy(&mut file, writer) {
        Ok(size) => Ok(size),
        Err(e) => {
            // Drop the half-written entry so the archive stays consistent.
            let _ = writer.abort_file();
            Err(exn::Exn::from(e).raise(ErrorKind::Io))
        },
    }
}
