//! Republish an archived module cache as a directory that `GOPROXY=file://`
//! can serve from.

use crate::copy::{CopyOutcome, SkipReason, copy_new};
use crate::error::{ErrorKind, Result};
use crate::scratch::extract;
use crate::walk::{Visit, walk};
use async_stream::stream;
use exn::ResultExt;
use futures::future::join_all;
use futures::{Stream, StreamExt};
use gop_asyncutils::{BoundedExt, DEFAULT_WORKERS};
use gop_module::{DESCRIPTOR_EXT, SUMDB_DIR, VERSION_DIR_SUFFIX};
use std::fs::FileType;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::pin::pin;
use tokio::fs;
use tracing::instrument;

/// Files the package manager keeps next to module versions for its own
/// bookkeeping. `list` is regenerated instead of copied.
const HOUSEKEEPING: &[&str] = &["list", "list.lock", "lock"];
const LIST_FILE: &str = "list";

enum WorkItem {
    /// A checksum-database file, copied verbatim.
    Checksum { source: PathBuf, relative: PathBuf },
    /// A directory holding every version of one module path.
    Module { source: PathBuf, relative: PathBuf },
}

/// Progress events emitted by [`FolderPublisher::publish_tree`].
///
/// [`Started`](Self::Started) comes first and [`Complete`](Self::Complete)
/// last; everything in between arrives in completion order. Paths are
/// relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishEvent {
    Started,
    Copied { path: PathBuf, bytes: u64 },
    /// The destination existed (or couldn't be inspected) and was kept.
    Skipped { path: PathBuf, reason: SkipReason },
    /// A module's `list` file was rewritten with these versions.
    Indexed { module: PathBuf, versions: Vec<String> },
    Complete,
}

/// Outcome of [`FolderPublisher::publish_archive`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderReport {
    /// Absolute path of the output directory.
    pub root: PathBuf,
    pub copied: usize,
    pub skipped: usize,
    pub modules: usize,
    pub failed: usize,
}

impl FolderReport {
    /// Environment settings that make the toolchain fetch from [`root`](Self::root).
    pub fn hints(&self) -> [String; 2] {
        hints(&self.root)
    }
}

/// `go env` commands for using `root` as the module proxy in an air-gapped
/// environment.
pub fn hints(root: &Path) -> [String; 2] {
    let url_path = root.to_string_lossy().replace('\\', "/");
    [
        format!("go env -w GOPROXY=file:///{}", url_path.trim_start_matches('/')),
        "go env -w GOSUMDB=off".to_string(),
    ]
}

/// Rebuilds the proxy layout from an extracted module cache.
///
/// Republishing is additive: existing files in the output directory are never
/// overwritten, so the same output can be fed archive after archive.
#[derive(Debug, Clone)]
pub struct FolderPublisher {
    output: PathBuf,
    workers: usize,
}

impl FolderPublisher {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self { output: output.into(), workers: DEFAULT_WORKERS }
    }

    /// Number of files and modules processed concurrently.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Create the output directory if needed and return its absolute path.
    pub async fn prepare_output(&self) -> Result<PathBuf> {
        let output = || ErrorKind::Output(self.output.clone());
        match fs::metadata(&self.output).await {
            Ok(metadata) if metadata.is_dir() => {},
            Ok(_) => exn::bail!(ErrorKind::NotADirectory(self.output.clone())),
            Err(e) if e.kind() == IoErrorKind::NotFound => fs::create_dir_all(&self.output).await.or_raise(output)?,
            Err(e) => return Err(exn::Exn::from(e).raise(output())),
        }
        fs::canonicalize(&self.output).await.or_raise(output)
    }

    /// Extract `archive` and republish its download cache into the output
    /// directory, logging progress as it goes.
    ///
    /// Only setup failures are returned as errors; failed files and modules
    /// are logged and counted in [`FolderReport::failed`].
    #[instrument(skip_all, fields(archive = %archive.display(), output = %self.output.display()))]
    pub async fn publish_archive(&self, archive: &Path) -> Result<FolderReport> {
        let root = self.prepare_output().await?;
        let scratch = extract(archive).await?;
        let download = scratch.path().join("cache").join("download");
        if !fs::try_exists(&download).await.unwrap_or(false) {
            exn::bail!(ErrorKind::MissingDownloadCache);
        }

        tracing::info!("processing files");
        let mut report = FolderReport { root, ..FolderReport::default() };
        let mut events = pin!(self.publish_tree(&download));
        while let Some(event) = events.next().await {
            match event {
                Ok(PublishEvent::Started | PublishEvent::Complete) => {},
                Ok(PublishEvent::Copied { path, bytes }) => {
                    report.copied += 1;
                    tracing::trace!(path = %path.display(), bytes, "copied");
                },
                Ok(PublishEvent::Skipped { path, reason }) => {
                    report.skipped += 1;
                    tracing::debug!(path = %path.display(), reason = %reason, "skipping file");
                },
                Ok(PublishEvent::Indexed { module, versions }) => {
                    report.modules += 1;
                    tracing::debug!(module = %module.display(), versions = versions.len(), "updated list file");
                },
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("{e}");
                    tracing::debug!(error = ?e, "failure details");
                },
            }
        }

        tracing::info!(
            path = %report.root.display(),
            copied = report.copied,
            skipped = report.skipped,
            modules = report.modules,
            failed = report.failed,
            "published archive"
        );
        Ok(report)
    }

    /// Stream the republishing of an extracted download cache rooted at
    /// `download_root`.
    ///
    /// Checksum-database files are copied one per work item; each `@v`
    /// directory is one work item that copies its version files and then
    /// regenerates the `list` index. Matched subtrees are not walked any
    /// further. Work items run through a pool of [`with_workers`](Self::with_workers)
    /// slots while discovery continues.
    pub fn publish_tree<'a>(&'a self, download_root: &'a Path) -> impl Stream<Item = Result<PublishEvent>> + 'a {
        let output = self.output.as_path();
        let root = download_root.to_path_buf();
        let work = walk(download_root.to_path_buf(), move |path, file_type| classify(&root, path, file_type)).bounded(
            self.workers,
            move |item| async move {
                match item {
                    Err(e) => vec![Err(e)],
                    Ok(WorkItem::Checksum { source, relative }) => vec![copy_event(source, relative, output).await],
                    Ok(WorkItem::Module { source, relative }) => publish_module(&source, relative, output).await,
                }
            },
        );
        stream! {
            yield Ok(PublishEvent::Started);
            for await events in work {
                for event in events {
                    yield event;
                }
            }
            yield Ok(PublishEvent::Complete);
        }
    }
}

fn classify(root: &Path, path: &Path, file_type: FileType) -> Visit<WorkItem> {
    let Ok(relative) = path.strip_prefix(root) else {
        return Visit::Skip;
    };
    if file_type.is_file() && relative.starts_with(SUMDB_DIR) {
        return Visit::Item(WorkItem::Checksum { source: path.to_path_buf(), relative: relative.to_path_buf() });
    }
    if !file_type.is_dir() {
        return Visit::Skip;
    }
    let is_module = path.file_name().and_then(|name| name.to_str()).is_some_and(|name| name.ends_with(VERSION_DIR_SUFFIX));
    match is_module {
        true => Visit::Item(WorkItem::Module { source: path.to_path_buf(), relative: relative.to_path_buf() }),
        false => Visit::Descend,
    }
}

async fn copy_event(source: PathBuf, relative: PathBuf, output: &Path) -> Result<PublishEvent> {
    Ok(match copy_new(&source, &output.join(&relative)).await? {
        CopyOutcome::Copied(bytes) => PublishEvent::Copied { path: relative, bytes },
        CopyOutcome::Skipped(reason) => PublishEvent::Skipped { path: relative, reason },
    })
}

async fn publish_module(source: &Path, relative: PathBuf, output: &Path) -> Vec<Result<PublishEvent>> {
    let names = match file_names(source).await {
        Ok(names) => names,
        Err(e) => return vec![Err(e)],
    };
    let copies = names
        .into_iter()
        .filter(|name| !HOUSEKEEPING.contains(&name.as_str()))
        .map(|name| copy_event(source.join(&name), relative.join(name), output));
    let mut events = join_all(copies).await;
    let index = regenerate_list(&output.join(&relative)).await;
    events.push(index.map(|versions| PublishEvent::Indexed { module: relative, versions }));
    events
}

/// Names of the regular files directly inside `dir`.
async fn file_names(dir: &Path) -> Result<Vec<String>> {
    let walk_error = || ErrorKind::Walk(dir.to_path_buf());
    let mut entries = fs::read_dir(dir).await.or_raise(walk_error)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.or_raise(walk_error)? {
        if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Rewrite `module_dir/list` from the descriptor files present in
/// `module_dir`, returning the versions written.
///
/// The index reflects what the destination holds after copying (previously
/// published versions included), sorted so the file is stable across runs.
pub async fn regenerate_list(module_dir: &Path) -> Result<Vec<String>> {
    let index_error = || ErrorKind::Index(module_dir.to_path_buf());
    fs::create_dir_all(module_dir).await.or_raise(index_error)?;
    let suffix = format!(".{DESCRIPTOR_EXT}");
    let mut versions: Vec<String> = file_names(module_dir)
        .await
        .or_raise(index_error)?
        .into_iter()
        .filter_map(|name| name.strip_suffix(suffix.as_str()).filter(|v| !v.is_empty()).map(str::to_string))
        .collect();
    versions.sort();

    let mut content = versions.join("\n");
    if !versions.is_empty() {
        content.push('\n');
    }
    fs::write(module_dir.join(LIST_FILE), content).await.or_raise(index_error)?;
    Ok(versions)
}
