//! Upload extracted module versions to an Artifactory Go repository.

use crate::error::{ErrorKind, Result};
use crate::scratch::extract;
use crate::walk::{Visit, walk};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use gop_asyncutils::BoundedExt;
use gop_module::{Coordinate, codec};
use std::fs::FileType;
use std::path::{Component, Path, PathBuf};
use std::pin::pin;
use tokio::fs;
use tokio::process::Command;
use tracing::instrument;

const JFROG: &str = "jfrog";
const GO_MOD: &str = "go.mod";
/// Top-level directory holding the download cache rather than extracted
/// module sources.
const DOWNLOAD_CACHE_DIR: &str = "cache";

/// Pushes one extracted module version to a remote repository.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    async fn upload(&self, module: &ModuleDir) -> Result<()>;
}

/// A directory holding the extracted sources of one module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDir {
    pub dir: PathBuf,
    pub module: Coordinate,
}

impl ModuleDir {
    /// Derive the module coordinate from a directory below `root`.
    ///
    /// The base name is split on its last `@` into path and version; the
    /// module path is the decoded parent path joined with the part before `@`.
    pub fn from_dir(root: &Path, dir: &Path) -> Result<Self> {
        let invalid = || ErrorKind::InvalidModuleDir(dir.display().to_string());
        let relative = dir.strip_prefix(root).or_raise(invalid)?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str().ok_or_else(|| exn::Exn::new(invalid()))?),
                _ => exn::bail!(invalid()),
            }
        }
        let Some((name, parents)) = parts.split_last() else {
            exn::bail!(invalid());
        };
        let Some((encoded_name, encoded_version)) = name.rsplit_once('@') else {
            exn::bail!(invalid());
        };
        if encoded_name.is_empty() || encoded_version.is_empty() {
            exn::bail!(invalid());
        }
        let encoded_path =
            parents.iter().copied().chain(std::iter::once(encoded_name)).collect::<Vec<_>>().join("/");
        let path = codec::decode(&encoded_path).or_raise(invalid)?;
        let version = codec::decode(encoded_version).or_raise(invalid)?;
        Ok(Self { dir: dir.to_path_buf(), module: Coordinate::new(path, version) })
    }

    /// Write a minimal `go.mod` naming the module if the sources lack one.
    ///
    /// Returns `true` when a descriptor was written.
    pub async fn ensure_go_mod(&self) -> Result<bool> {
        let descriptor = self.dir.join(GO_MOD);
        if fs::try_exists(&descriptor).await.or_raise(|| ErrorKind::Io)? {
            return Ok(false);
        }
        fs::write(&descriptor, format!("module {}\n", self.module.path)).await.or_raise(|| ErrorKind::Io)?;
        Ok(true)
    }
}

/// Progress events emitted by [`upload_modules`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Started,
    /// A placeholder `go.mod` was written before uploading.
    GoModSynthesized(Coordinate),
    Uploaded(Coordinate),
    Complete,
}

/// Outcome of [`publish_archive`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// The `jfrog` command line tool.
#[derive(Debug, Clone)]
pub struct JfrogCli {
    binary: PathBuf,
    repository: String,
}

impl JfrogCli {
    pub fn new(binary: PathBuf, repository: impl Into<String>) -> Self {
        Self { binary, repository: repository.into() }
    }

    /// Use `explicit` if given, otherwise find `jfrog` on `PATH`.
    pub fn discover(explicit: Option<&Path>, repository: impl Into<String>) -> Result<Self> {
        let binary = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => {
                tracing::info!(path = %path.display(), "configured jfrog path is not a file");
                exn::bail!(ErrorKind::BinaryNotFound(JFROG.to_string()));
            },
            None => which::which(JFROG).or_raise(|| ErrorKind::BinaryNotFound(JFROG.to_string()))?,
        };
        tracing::trace!(binary = %binary.display(), "using jfrog cli");
        Ok(Self::new(binary, repository))
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Server, URL and user lines of the active `jfrog` configuration.
    ///
    /// An empty summary means the tool has not been configured, which is
    /// fatal for publishing.
    pub async fn config_summary(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.binary)
            .args(["rt", "c", "show"])
            .output()
            .await
            .or_raise(|| ErrorKind::Command("jfrog rt c show".to_string()))?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Command(format!("jfrog rt c show ({})", output.status)));
        }
        let summary = config_lines(&String::from_utf8_lossy(&output.stdout));
        if summary.is_empty() {
            exn::bail!(ErrorKind::NotConfigured);
        }
        Ok(summary)
    }
}

#[async_trait]
impl ArtifactUploader for JfrogCli {
    async fn upload(&self, module: &ModuleDir) -> Result<()> {
        let rendered = format!("jfrog rt gp {} {}", self.repository, module.module.version);
        let output = Command::new(&self.binary)
            .args(["rt", "gp", &self.repository, &module.module.version])
            .current_dir(&module.dir)
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Command(rendered.clone()))?;
        if !output.status.success() {
            let mut detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if detail.is_empty() {
                detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            exn::bail!(ErrorKind::Command(format!("{rendered} ({}): {detail}", output.status)));
        }
        Ok(())
    }
}

/// Keep the lines of `jfrog rt c show` output that identify the target.
pub fn config_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| {
            let lower = line.to_lowercase();
            ["server", "url", "user"].iter().any(|prefix| lower.starts_with(prefix))
        })
        .map(str::to_string)
        .collect()
}

fn classify(root: &Path, path: &Path, file_type: FileType) -> Visit<Result<ModuleDir>> {
    if !file_type.is_dir() {
        return Visit::Skip;
    }
    if path.strip_prefix(root).is_ok_and(|relative| relative == Path::new(DOWNLOAD_CACHE_DIR)) {
        return Visit::Skip;
    }
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return Visit::Skip;
    };
    match name.contains('@') {
        true => Visit::Item(ModuleDir::from_dir(root, path)),
        false => Visit::Descend,
    }
}

/// Stream the upload of every module-version directory below `root`.
///
/// Directories are discovered by a single walk (the top-level download cache
/// is skipped) and uploaded by `workers` concurrent uploads. A failed upload is
/// yielded as an `Err` item and does not stop the others.
pub fn upload_modules<'a, U>(uploader: &'a U, root: &'a Path, workers: usize) -> impl Stream<Item = Result<UploadEvent>> + 'a
where
    U: ArtifactUploader + ?Sized,
{
    let base = root.to_path_buf();
    let work = walk(root.to_path_buf(), move |path, file_type| classify(&base, path, file_type)).bounded(
        workers,
        move |item| async move {
            let module = match item.and_then(|module| module) {
                Ok(module) => module,
                Err(e) => return vec![Err(e)],
            };
            let mut events = Vec::with_capacity(2);
            match module.ensure_go_mod().await {
                Ok(true) => events.push(Ok(UploadEvent::GoModSynthesized(module.module.clone()))),
                Ok(false) => {},
                Err(e) => events.push(Err(e)),
            }
            events.push(match uploader.upload(&module).await {
                Ok(()) => Ok(UploadEvent::Uploaded(module.module)),
                Err(e) => Err(e.raise(ErrorKind::Upload(module.module.key()))),
            });
            events
        },
    );
    stream! {
        yield Ok(UploadEvent::Started);
        for await events in work {
            for event in events {
                yield event;
            }
        }
        yield Ok(UploadEvent::Complete);
    }
}

/// Extract `archive` and upload every module version it contains.
#[instrument(skip_all, fields(archive = %archive.display()))]
pub async fn publish_archive<U>(uploader: &U, archive: &Path, workers: usize) -> Result<UploadReport>
where
    U: ArtifactUploader + ?Sized,
{
    let scratch = extract(archive).await?;
    tracing::info!("publishing modules");
    let mut report = UploadReport::default();
    let mut events = pin!(upload_modules(uploader, scratch.path(), workers));
    while let Some(event) = events.next().await {
        match event {
            Ok(UploadEvent::Started | UploadEvent::Complete) => {},
            Ok(UploadEvent::GoModSynthesized(module)) => tracing::debug!(module = %module, "wrote placeholder go.mod"),
            Ok(UploadEvent::Uploaded(module)) => {
                report.uploaded += 1;
                tracing::debug!(module = %module, "published module");
            },
            Err(e) => {
                report.failed += 1;
                tracing::warn!("{e}");
                tracing::debug!(error = ?e, "failure details");
            },
        }
    }
    tracing::info!(uploaded = report.uploaded, failed = report.failed, "modules uploaded");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gop_archive::Compression;
    use rstest::rstest;
    use std::collections::BTreeMap;
    use std::fs as std_fs;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingUploader {
        uploads: Mutex<BTreeMap<String, String>>,
        fail_version: Option<String>,
    }

    #[async_trait]
    impl ArtifactUploader for RecordingUploader {
        async fn upload(&self, module: &ModuleDir) -> Result<()> {
            if self.fail_version.as_deref() == Some(module.module.version.as_str()) {
                exn::bail!(ErrorKind::Command("jfrog rt gp (exit status: 1)".to_string()));
            }
            let descriptor = std_fs::read_to_string(module.dir.join(GO_MOD)).unwrap_or_default();
            self.uploads.lock().unwrap().insert(module.module.key(), descriptor);
            Ok(())
        }
    }

    fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (name, contents) in files {
            let path = root.join(name);
            std_fs::create_dir_all(path.parent().unwrap()).unwrap();
            std_fs::write(path, contents).unwrap();
        }
    }

    const TREE: &[(&str, &str)] = &[
        ("cache/download/github.com/!burnt!sushi/toml/@v/v1.3.2.zip", "zip"),
        ("cache/download/sumdb/sum.golang.org/lookup/x@v1", "proof"),
        ("github.com/!burnt!sushi/toml@v1.3.2/go.mod", "module github.com/BurntSushi/toml\n"),
        ("github.com/!burnt!sushi/toml@v1.3.2/decode.go", "package toml\n"),
        ("example.com/legacy@v0.1.0/legacy.go", "package legacy\n"),
    ];

    #[rstest]
    #[case("github.com/!burnt!sushi/toml@v1.3.2", "github.com/BurntSushi/toml", "v1.3.2")]
    #[case("example.com/a/b@v1.0.0-!r!c1", "example.com/a/b", "v1.0.0-RC1")]
    #[case("top@v2.0.0", "top", "v2.0.0")]
    #[case("example.com/x@y@v1.0.0", "example.com/x@y", "v1.0.0")]
    fn module_dir_names(#[case] relative: &str, #[case] path: &str, #[case] version: &str) {
        let root = Path::new("/scratch");
        let module = ModuleDir::from_dir(root, &root.join(relative)).unwrap();
        assert_eq!(module.module, Coordinate::new(path, version));
    }

    #[rstest]
    #[case("example.com/x@")]
    #[case("example.com/@v1.0.0")]
    #[case("example.com/Upper@v1.0.0")]
    fn invalid_module_dir_names(#[case] relative: &str) {
        let root = Path::new("/scratch");
        let err = ModuleDir::from_dir(root, &root.join(relative)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidModuleDir(_)));
    }

    #[test]
    fn config_summary_lines() {
        let output = "Server ID:\t\tdefault\nJFrog Platform URL:\thttps://acme.jfrog.io/\n\
                      Artifactory URL:\thttps://acme.jfrog.io/artifactory/\nUser:\t\t\tci\nPassword:\t\t***\n\
                      url: https://legacy\n";
        assert_eq!(config_lines(output), vec!["Server ID:\t\tdefault", "User:\t\t\tci", "url: https://legacy"]);
        assert!(config_lines("").is_empty());
    }

    #[tokio::test]
    async fn uploads_every_module_version() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), TREE);
        let uploader = RecordingUploader::default();

        let events: Vec<_> = upload_modules(&uploader, dir.path(), 2).collect().await;
        assert!(events.iter().all(std::result::Result::is_ok));

        let uploads = uploader.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads["github.com/BurntSushi/toml@v1.3.2"], "module github.com/BurntSushi/toml\n");
        // Synthesized from the decoded directory path.
        assert_eq!(uploads["example.com/legacy@v0.1.0"], "module example.com/legacy\n");
    }

    #[tokio::test]
    async fn only_the_download_cache_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("cache/download/github.com/pquerna/cachecontrol/@v/v0.1.0.zip", "zip"),
                ("github.com/pquerna/cachecontrol@v0.1.0/go.mod", "module github.com/pquerna/cachecontrol\n"),
                ("github.com/cachix/tool@v1.0.0/go.mod", "module github.com/cachix/tool\n"),
                ("cache.example.com/lib@v2.0.0/lib.go", "package lib\n"),
                ("example.com/a@v1.0.0/go.mod", "module example.com/a\n"),
            ],
        );
        let uploader = RecordingUploader::default();

        let events: Vec<_> = upload_modules(&uploader, dir.path(), 2).collect().await;
        assert!(events.iter().all(std::result::Result::is_ok));

        let uploaded: Vec<_> = uploader.uploads.lock().unwrap().keys().cloned().collect();
        assert_eq!(
            uploaded,
            vec![
                "cache.example.com/lib@v2.0.0",
                "example.com/a@v1.0.0",
                "github.com/cachix/tool@v1.0.0",
                "github.com/pquerna/cachecontrol@v0.1.0",
            ]
        );
    }

    #[tokio::test]
    async fn failed_upload_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), TREE);
        let uploader = RecordingUploader { fail_version: Some("v0.1.0".to_string()), ..RecordingUploader::default() };

        let events: Vec<_> = upload_modules(&uploader, dir.path(), 1).collect().await;
        let failures: Vec<_> = events.iter().filter_map(|e| e.as_ref().err()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(**failures[0], ErrorKind::Upload("example.com/legacy@v0.1.0".to_string()));
        assert_eq!(uploader.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn publishes_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("modcache");
        write_tree(&cache, TREE);
        let archive = dir.path().join("gop_dependencies.zip");
        gop_archive::pack(&cache, &archive, Compression::Deflate).unwrap();

        let uploader = RecordingUploader::default();
        let report = publish_archive(&uploader, &archive, 4).await.unwrap();
        assert_eq!(report, UploadReport { uploaded: 2, failed: 0 });
    }

    #[test]
    fn discover_rejects_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = JfrogCli::discover(Some(&dir.path().join("jfrog")), "go-local").unwrap_err();
        assert_eq!(*err, ErrorKind::BinaryNotFound("jfrog".to_string()));
    }
}
