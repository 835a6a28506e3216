use crate::error::Result;
use async_trait::async_trait;
use gop_module::{Coordinate, DependencyEdge, ModuleRecord};

/// The package manager, seen as an opaque capability.
///
/// Implementations download modules into an isolated cache and report the
/// dependency graph of a downloaded module. The closure resolver only ever
/// talks to the package manager through this trait, so a synthetic provider
/// can stand in for the real binary in tests.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Download `coordinate` into the cache.
    ///
    /// A record the resolver marks as failed must be returned as an `Err`.
    async fn fetch(&self, coordinate: &Coordinate) -> Result<ModuleRecord>;

    /// Dependency edges of a module previously returned by [`fetch`](Self::fetch).
    async fn graph(&self, record: &ModuleRecord) -> Result<Vec<DependencyEdge>>;

    /// Whether `coordinate` is already present in the cache, in which case
    /// the closure resolver doesn't fetch it again.
    async fn is_cached(&self, _coordinate: &Coordinate) -> bool {
        false
    }
}
