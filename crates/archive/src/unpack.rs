//! Archive extraction.

use crate::error::{ErrorKind, Result};
use crate::util::from_zip_time;
use exn::ResultExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind as IoErrorKind, Read};
use std::path::Path;
use tracing::instrument;
use zip::ZipArchive;
use zip::read::ZipFile;

/// Summary of an [`unpack`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnpackStats {
    /// Files written to the destination.
    pub extracted: usize,
    /// Entries whose destination file already existed.
    pub existing: usize,
    /// Entries that were unsafe or could not be written.
    pub skipped: usize,
}

enum Outcome {
    Written,
    Exists,
}

/// Extract every entry of `archive` below `dest`, creating `dest` if needed.
///
/// Existing files are never overwritten; such entries are counted in
/// [`UnpackStats::existing`] so extraction into a reused directory is
/// idempotent. Entry names that would escape `dest` are skipped.
#[instrument(skip_all, fields(archive = %archive.display(), dest = %dest.display()))]
pub fn unpack(archive: &Path, dest: &Path) -> Result<UnpackStats> {
    fs::create_dir_all(dest).or_raise(|| ErrorKind::Io)?;
    let file = File::open(archive).or_raise(|| ErrorKind::Io)?;
    let mut zip = ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::InvalidArchive)?;

    let mut stats = UnpackStats::default();
    for index in 0..zip.len() {
        let mut entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(index, error = %e, "unreadable archive entry");
                stats.skipped += 1;
                continue;
            },
        };
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), "skipping entry with unsafe name");
            stats.skipped += 1;
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            if let Err(e) = fs::create_dir_all(&target) {
                tracing::warn!(entry = entry.name(), error = %e, "failed to create directory");
                stats.skipped += 1;
            }
            continue;
        }
        match extract_entry(&mut entry, &target) {
            Ok(Outcome::Written) => stats.extracted += 1,
            Ok(Outcome::Exists) => {
                tracing::warn!(path = %target.display(), "destination exists, skipping entry");
                stats.existing += 1;
            },
            Err(e) => {
                tracing::warn!(entry = entry.name(), error = ?e, "failed to extract entry");
                stats.skipped += 1;
            },
        }
    }
    tracing::info!(
        extracted = stats.extracted,
        existing = stats.existing,
        skipped = stats.skipped,
        "archive extracted"
    );
    Ok(stats)
}

fn extract_entry<R: Read>(entry: &mut ZipFile<'_, R>, target: &Path) -> Result<Outcome> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
    }
    let mut out = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(out) => out,
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => return Ok(Outcome::Exists),
        Err(e) => return Err(exn::Exn::from(e).raise(ErrorKind::Io)),
    };
    std::io::copy(entry, &mut out).or_raise(|| ErrorKind::Io)?;
    if let Some(modified) = entry.last_modified().and_then(from_zip_time)
        && let Err(e) = out.set_modified(modified)
    {
        tracing::debug!(path = %target.display(), error = %e, "could not restore modification time");
    }
    Ok(Outcome::Written)
}
