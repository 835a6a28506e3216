use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Placeholder descriptor written before fetching individual modules; the
/// package manager refuses to download outside of a module.
pub const GO_MOD_TEMPLATE: &str = "module go-offline-packager\n\ngo 1.13\n";

const GO_MOD: &str = "go.mod";
const CACHE_DIR: &str = "modcache";

/// Scratch directory for one packing run: a `go.mod` and an isolated module
/// cache below `modcache/`.
///
/// The module cache is written read-only by the package manager, so
/// permissions are relaxed before the directory is removed on drop.
#[derive(Debug)]
pub struct WorkDir {
    dir: Option<TempDir>,
    root: PathBuf,
    cache: PathBuf,
}

impl WorkDir {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("gop_").tempdir().or_raise(|| ErrorKind::WorkDir)?;
        let root = dir.path().to_path_buf();
        let cache = root.join(CACHE_DIR);
        fs::create_dir(&cache).or_raise(|| ErrorKind::WorkDir)?;
        tracing::debug!(path = %root.display(), "created working directory");
        Ok(Self { dir: Some(dir), root, cache })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The isolated module cache; this is what gets archived.
    pub fn cache(&self) -> &Path {
        &self.cache
    }

    pub fn go_mod(&self) -> PathBuf {
        self.root.join(GO_MOD)
    }

    pub fn write_placeholder_go_mod(&self) -> Result<()> {
        fs::write(self.go_mod(), GO_MOD_TEMPLATE).or_raise(|| ErrorKind::WorkDir)
    }

    /// Use an existing descriptor instead of the placeholder.
    pub fn install_go_mod(&self, source: &Path) -> Result<()> {
        fs::copy(source, self.go_mod()).or_raise(|| ErrorKind::WorkDir)?;
        Ok(())
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        relax_permissions(dir.path());
        if let Err(e) = dir.close() {
            tracing::debug!(path = %self.root.display(), error = %e, "can't remove working directory");
        }
    }
}

fn relax_permissions(root: &Path) {
    for entry in WalkDir::new(root).follow_links(false).into_iter().filter_map(std::result::Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.file_type().is_symlink() {
            continue;
        }
        let mut permissions = metadata.permissions();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            permissions.set_mode(if metadata.is_dir() { 0o755 } else { 0o644 });
        }
        #[cfg(not(unix))]
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        if let Err(e) = fs::set_permissions(entry.path(), permissions) {
            tracing::debug!(path = %entry.path().display(), error = %e, "can't relax permissions");
        }
    }
}
