use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use tempfile::TempDir;

/// Extract `archive` into a fresh scratch directory, removed on drop.
pub(crate) async fn extract(archive: &Path) -> Result<TempDir> {
    let scratch = tempfile::Builder::new().prefix("gop_").tempdir().or_raise(|| ErrorKind::WorkDir)?;
    tracing::info!(archive = %archive.display(), "extracting archive");
    let (archive, dest) = (archive.to_path_buf(), scratch.path().to_path_buf());
    let stats = tokio::task::spawn_blocking(move || gop_archive::unpack(&archive, &dest))
        .await
        .or_raise(|| ErrorKind::Extract)?
        .or_raise(|| ErrorKind::Extract)?;
    tracing::debug!(path = %scratch.path().display(), files = stats.extracted, "extracted to scratch directory");
    Ok(scratch)
}
