//! In-memory cache provider for testing.

use crate::error::{ErrorKind, Result};
use crate::provider::CacheProvider;
use async_trait::async_trait;
use gop_module::{Coordinate, DependencyEdge, LATEST, ModuleRecord};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Module {
    dependencies: Vec<Coordinate>,
    fetch_error: Option<String>,
    graph_error: bool,
}

/// Synthetic dependency graph standing in for the package manager.
///
/// Coordinates are registered as `path@version` strings. Fetching an
/// unregistered coordinate fails, as does fetching a module registered with
/// [`with_failure`](Self::with_failure). `@latest` resolves to the greatest
/// registered version of that path.
///
/// # Examples
///
/// ```
/// use gop_resolver::{CacheProvider, MockProvider};
/// use gop_module::Coordinate;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let provider = MockProvider::new().with_module("example.com/a@v1.0.0", ["example.com/b@v2.0.0"]);
/// let record = provider.fetch(&Coordinate::new("example.com/a", "latest")).await.unwrap();
/// assert_eq!(record.version, "v1.0.0");
/// let edges = provider.graph(&record).await.unwrap();
/// assert_eq!(edges[0].to.key(), "example.com/b@v2.0.0");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockProvider {
    modules: HashMap<String, Module>,
    cached: HashSet<String>,
    fetched: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolvable module and the edges its graph reports.
    ///
    /// Panics on malformed coordinates; broken test setup should not pass.
    pub fn with_module<'a>(mut self, coordinate: &str, dependencies: impl IntoIterator<Item = &'a str>) -> Self {
        let dependencies = dependencies.into_iter().map(parse).collect();
        self.modules.entry(key(coordinate)).or_default().dependencies = dependencies;
        self
    }

    /// Register a module whose fetch fails with `reason`.
    pub fn with_failure(mut self, coordinate: &str, reason: &str) -> Self {
        self.modules.entry(key(coordinate)).or_default().fetch_error = Some(reason.to_string());
        self
    }

    /// Register a module whose graph query fails.
    pub fn with_graph_failure(mut self, coordinate: &str) -> Self {
        self.modules.entry(key(coordinate)).or_default().graph_error = true;
        self
    }

    /// Mark a coordinate as already present in the cache.
    pub fn with_cached(mut self, coordinate: &str) -> Self {
        self.cached.insert(key(coordinate));
        self
    }

    /// Every coordinate passed to `fetch`, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Number of times `coordinate` was fetched.
    pub fn fetch_count(&self, coordinate: &str) -> usize {
        let wanted = key(coordinate);
        self.fetched().iter().filter(|k| **k == wanted).count()
    }

    /// Highest number of fetches that were in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn resolve_latest(&self, coordinate: &Coordinate) -> Coordinate {
        if coordinate.version != LATEST {
            return coordinate.clone();
        }
        self.modules
            .keys()
            .filter_map(|k| Coordinate::parse(k).ok())
            .filter(|c| c.path == coordinate.path)
            .max_by(|a, b| a.version.cmp(&b.version))
            .unwrap_or_else(|| coordinate.clone())
    }
}

#[async_trait]
impl CacheProvider for MockProvider {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<ModuleRecord> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if let Ok(mut fetched) = self.fetched.lock() {
            fetched.push(coordinate.key());
        }
        // Give sibling workers a chance to overlap.
        tokio::task::yield_now().await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let resolved = self.resolve_latest(coordinate);
        let Some(module) = self.modules.get(&resolved.key()) else {
            exn::bail!(ErrorKind::Resolution(format!("{coordinate}: unknown revision")));
        };
        if let Some(reason) = &module.fetch_error {
            exn::bail!(ErrorKind::Resolution(reason.clone()));
        }
        Ok(ModuleRecord {
            path: resolved.path.clone(),
            version: resolved.version.clone(),
            dir: Some(PathBuf::from("/mock").join(resolved.key())),
            ..ModuleRecord::default()
        })
    }

    async fn graph(&self, record: &ModuleRecord) -> Result<Vec<DependencyEdge>> {
        let from = record.coordinate();
        let Some(module) = self.modules.get(&from.key()) else {
            exn::bail!(ErrorKind::MissingSourceDir(from.key()));
        };
        if module.graph_error {
            exn::bail!(ErrorKind::Command("go mod graph (exit status: 1)".to_string()));
        }
        Ok(module.dependencies.iter().map(|to| DependencyEdge { from: from.clone(), to: to.clone() }).collect())
    }

    async fn is_cached(&self, coordinate: &Coordinate) -> bool {
        self.cached.contains(&coordinate.key())
    }
}

fn parse(coordinate: &str) -> Coordinate {
    #[allow(clippy::expect_used)]
    Coordinate::parse(coordinate).expect("mock coordinates must be valid")
}

fn key(coordinate: &str) -> String {
    parse(coordinate).key()
}
