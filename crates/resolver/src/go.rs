use crate::error::{ErrorKind, Result};
use crate::provider::CacheProvider;
use crate::workdir::WorkDir;
use async_trait::async_trait;
use exn::ResultExt;
use gop_module::{Coordinate, DependencyEdge, ModuleRecord};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::instrument;

const GO: &str = "go";
const MODCACHE_ENV: &str = "GOMODCACHE";

/// Locate an external binary: the explicit path if one is configured,
/// otherwise the first match on `PATH`.
pub fn locate_binary(name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        tracing::info!(binary = name, path = %path.display(), "configured binary path is not a file");
        exn::bail!(ErrorKind::BinaryNotFound(name.to_string()));
    }
    match which::which(name) {
        Ok(path) => {
            tracing::trace!(binary = name, path = %path.display(), "discovered binary on PATH");
            Ok(path)
        },
        Err(e) => Err(exn::Exn::from(e).raise(ErrorKind::BinaryNotFound(name.to_string()))),
    }
}

/// [`CacheProvider`] backed by the `go` toolchain.
///
/// Every invocation runs with `GOMODCACHE` pointed at the work directory's
/// private cache so the user's global module cache is never touched.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    binary: PathBuf,
    work_dir: PathBuf,
    cache_dir: PathBuf,
}

impl GoToolchain {
    pub fn new(binary: PathBuf, work_dir: &WorkDir) -> Self {
        Self { binary, work_dir: work_dir.path().to_path_buf(), cache_dir: work_dir.cache().to_path_buf() }
    }

    /// Locate `go` (see [`locate_binary`]) and bind it to `work_dir`.
    pub fn discover(explicit: Option<&Path>, work_dir: &WorkDir) -> Result<Self> {
        Ok(Self::new(locate_binary(GO, explicit)?, work_dir))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, cwd: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command.current_dir(cwd).env(MODCACHE_ENV, &self.cache_dir).kill_on_drop(true);
        command
    }

    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<Output> {
        let rendered = format!("{GO} {}", args.join(" "));
        tracing::trace!(command = %rendered, cwd = %cwd.display(), "running");
        self.command(cwd).args(args).output().await.or_raise(|| ErrorKind::Command(rendered))
    }

    /// Download everything the work directory's `go.mod` requires.
    ///
    /// Used when packing from an existing descriptor; a failure here is fatal
    /// for the run.
    #[instrument(skip(self))]
    pub async fn download_all(&self) -> Result<()> {
        let output = self.run(&self.work_dir, &["mod", "download"]).await?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Command(failure_message("go mod download", &output)));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheProvider for GoToolchain {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<ModuleRecord> {
        let target = coordinate.key();
        let output = self.run(&self.work_dir, &["mod", "download", "-json", &target]).await?;
        // The JSON document is printed on failure as well; its `Error` field
        // carries the reason.
        let record = match ModuleRecord::from_json(&output.stdout) {
            Ok(record) => record,
            Err(e) if !output.status.success() => {
                let message = failure_message(&format!("go mod download -json {target}"), &output);
                return Err(e.raise(ErrorKind::Command(message)));
            },
            Err(e) => return Err(e.raise(ErrorKind::MalformedOutput)),
        };
        if let Some(reason) = record.failure() {
            exn::bail!(ErrorKind::Resolution(reason.trim().to_string()));
        }
        Ok(record)
    }

    async fn graph(&self, record: &ModuleRecord) -> Result<Vec<DependencyEdge>> {
        let Some(dir) = record.dir.as_deref() else {
            exn::bail!(ErrorKind::MissingSourceDir(record.coordinate().key()));
        };
        let output = self.run(dir, &["mod", "graph"]).await?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Command(failure_message("go mod graph", &output)));
        }
        Ok(DependencyEdge::parse_graph(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn is_cached(&self, coordinate: &Coordinate) -> bool {
        let Ok(name) = coordinate.cache_dir_name() else {
            return false;
        };
        tokio::fs::try_exists(self.cache_dir.join(name)).await.unwrap_or(false)
    }
}

fn failure_message(command: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    match stderr.trim() {
        "" => format!("{command} ({})", output.status),
        detail => format!("{command} ({}): {detail}", output.status),
    }
}
