use crate::error::{ErrorKind, Result};
use crate::provider::CacheProvider;
use async_stream::stream;
use futures::{Stream, StreamExt};
use gop_asyncutils::{BoundedExt, DEFAULT_WORKERS};
use gop_module::{ClosureSet, Coordinate, ExclusionFilter};
use std::collections::HashSet;
use std::pin::pin;
use tracing::instrument;

/// Knobs for [`resolve_closure`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Expand every resolved seed by one hop of its dependency graph.
    pub transitive: bool,
    /// Width of the worker pool fetching transitive modules.
    pub workers: usize,
    pub exclude: ExclusionFilter,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { transitive: false, workers: DEFAULT_WORKERS, exclude: ExclusionFilter::default() }
    }
}

/// Progress events emitted by [`resolve_closure`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. Seed events ([`SeedResolved`](Self::SeedResolved), and when
///    transitive, [`Excluded`](Self::Excluded) and [`Queued`](Self::Queued)).
/// 3. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once.
/// 4. [`Fetched`](Self::Fetched) or [`Cached`](Self::Cached), once per queued
///    coordinate that resolves, in completion order.
/// 5. [`Complete`](Self::Complete) exactly once, carrying the closure.
///
/// Failures of individual seeds, graph queries or transitive fetches are
/// yielded as `Err` items in between and never end the stream.
#[derive(Debug)]
pub enum ResolveEvent {
    Started { seeds: usize },
    /// A seed was downloaded; carries the version the resolver settled on.
    SeedResolved(Coordinate),
    /// A graph edge pointed at an excluded pseudo-module.
    Excluded(Coordinate),
    /// A new transitive coordinate joined the pending queue.
    Queued(Coordinate),
    /// Every seed has been processed; this many coordinates are pending.
    DiscoveryComplete(usize),
    Fetched(Coordinate),
    /// A pending coordinate was already in the cache and was not fetched.
    Cached(Coordinate),
    Complete(ClosureSet),
}

enum Outcome {
    Fetched,
    Cached,
}

/// Stream the expansion of `seeds` into their dependency closure.
///
/// Seeds are fetched one after another (versionless seeds become `@latest`).
/// With [`ResolveOptions::transitive`], each resolved seed's graph is read and
/// every non-excluded edge target not already in the closure is queued. The
/// queue is then drained by a pool of [`ResolveOptions::workers`] concurrent
/// fetches. Queued modules are not expanded further: once the package manager
/// holds the full set it downloads whatever else the set needs by itself.
///
/// Workers never log; all reporting happens through the yielded events so a
/// single consumer owns the output.
pub fn resolve_closure<'a, P>(
    provider: &'a P,
    seeds: &'a [Coordinate],
    options: &'a ResolveOptions,
) -> impl Stream<Item = Result<ResolveEvent>> + 'a
where
    P: CacheProvider + ?Sized,
{
    stream!({
        yield Ok(ResolveEvent::Started { seeds: seeds.len() });

        let mut closure = ClosureSet::new();
        let mut pending: Vec<Coordinate> = Vec::new();
        let mut queued: HashSet<String> = HashSet::new();
        let mut requested: HashSet<String> = HashSet::new();

        for seed in seeds {
            let seed = seed.clone().versionized();
            if closure.contains(&seed) || !requested.insert(seed.key()) {
                continue;
            }
            let record = match provider.fetch(&seed).await {
                Ok(record) => record,
                Err(e) => {
                    yield Err(e.raise(ErrorKind::Fetch(seed.key())));
                    continue;
                },
            };
            let resolved = record.coordinate();
            closure.insert(resolved.clone());
            yield Ok(ResolveEvent::SeedResolved(resolved.clone()));

            if !options.transitive {
                continue;
            }
            let edges = match provider.graph(&record).await {
                Ok(edges) => edges,
                Err(e) => {
                    yield Err(e.raise(ErrorKind::Graph(resolved.key())));
                    continue;
                },
            };
            for edge in edges {
                let target = edge.to;
                if options.exclude.excludes(&target) {
                    yield Ok(ResolveEvent::Excluded(target));
                    continue;
                }
                if closure.contains(&target) || !queued.insert(target.key()) {
                    continue;
                }
                yield Ok(ResolveEvent::Queued(target.clone()));
                pending.push(target);
            }
        }

        // A later seed may have resolved to something queued earlier.
        pending.retain(|coordinate| !closure.contains(coordinate));
        yield Ok(ResolveEvent::DiscoveryComplete(pending.len()));

        let mut fetches = pin!(futures::stream::iter(pending).bounded(options.workers, move |coordinate| async move {
            if provider.is_cached(&coordinate).await {
                return (coordinate, Ok(Outcome::Cached));
            }
            let result = provider.fetch(&coordinate).await.map(|_| Outcome::Fetched);
            (coordinate, result)
        }));
        while let Some((coordinate, result)) = fetches.next().await {
            match result {
                Ok(outcome) => {
                    closure.insert(coordinate.clone());
                    yield Ok(match outcome {
                        Outcome::Fetched => ResolveEvent::Fetched(coordinate),
                        Outcome::Cached => ResolveEvent::Cached(coordinate),
                    });
                },
                Err(e) => yield Err(e.raise(ErrorKind::Fetch(coordinate.key()))),
            }
        }

        yield Ok(ResolveEvent::Complete(closure));
    })
}

/// Drain [`resolve_closure`], logging every event, and return the closure.
///
/// The batch always completes: failed items are logged and left out.
#[instrument(skip_all, fields(seeds = seeds.len(), transitive = options.transitive))]
pub async fn resolve<P>(provider: &P, seeds: &[Coordinate], options: &ResolveOptions) -> ClosureSet
where
    P: CacheProvider + ?Sized,
{
    let mut events = pin!(resolve_closure(provider, seeds, options));
    let mut failures = 0usize;
    while let Some(event) = events.next().await {
        match event {
            Ok(ResolveEvent::Started { seeds }) => tracing::info!(seeds, "processing modules"),
            Ok(ResolveEvent::SeedResolved(module)) => tracing::info!(module = %module, "downloaded module"),
            Ok(ResolveEvent::Excluded(module)) => tracing::debug!(module = %module, "skipping excluded module"),
            Ok(ResolveEvent::Queued(module)) => tracing::debug!(module = %module, "adding transitive module"),
            Ok(ResolveEvent::DiscoveryComplete(0)) => {},
            Ok(ResolveEvent::DiscoveryComplete(pending)) => {
                tracing::info!(pending, workers = options.workers, "downloading transitive modules");
            },
            Ok(ResolveEvent::Fetched(module)) => tracing::debug!(module = %module, "downloaded transitive module"),
            Ok(ResolveEvent::Cached(module)) => tracing::debug!(module = %module, "transitive module already cached"),
            Ok(ResolveEvent::Complete(closure)) => {
                tracing::info!(modules = closure.len(), failures, "resolution complete");
                return closure;
            },
            Err(e) => {
                failures += 1;
                tracing::warn!("{e}");
                tracing::debug!(error = ?e, "failure details");
            },
        }
    }
    ClosureSet::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use rstest::rstest;

    fn coordinates(keys: &[&str]) -> Vec<Coordinate> {
        keys.iter().map(|k| Coordinate::parse(k).unwrap()).collect()
    }

    fn keys(closure: &ClosureSet) -> Vec<String> {
        closure.sorted().into_iter().map(Coordinate::key).collect()
    }

    fn transitive() -> ResolveOptions {
        ResolveOptions { transitive: true, ..ResolveOptions::default() }
    }

    #[tokio::test]
    async fn excluded_targets_never_join_the_closure() {
        let provider = MockProvider::new().with_module("A@1.0", ["B@2.0", "go@1.21"]).with_module("B@2.0", []);
        let closure = resolve(&provider, &coordinates(&["A@1.0"]), &transitive()).await;
        assert_eq!(keys(&closure), vec!["A@1.0", "B@2.0"]);
        assert_eq!(provider.fetch_count("go@1.21"), 0);
    }

    #[tokio::test]
    async fn non_transitive_only_fetches_seeds() {
        let provider = MockProvider::new().with_module("A@1.0", ["B@2.0"]).with_module("B@2.0", []);
        let closure = resolve(&provider, &coordinates(&["A@1.0"]), &ResolveOptions::default()).await;
        assert_eq!(keys(&closure), vec!["A@1.0"]);
        assert_eq!(provider.fetched(), vec!["A@1.0"]);
    }

    #[tokio::test]
    async fn versionless_seed_resolves_latest() {
        let provider = MockProvider::new().with_module("example.com/a@v1.0.0", []).with_module("example.com/a@v1.2.0", []);
        let closure = resolve(&provider, &coordinates(&["example.com/a"]), &ResolveOptions::default()).await;
        assert_eq!(keys(&closure), vec!["example.com/a@v1.2.0"]);
        assert_eq!(provider.fetched(), vec!["example.com/a@latest"]);
    }

    #[tokio::test]
    async fn failed_seed_does_not_stop_the_batch() {
        let provider = MockProvider::new()
            .with_failure("broken@1.0", "unknown revision 1.0")
            .with_module("A@1.0", ["B@2.0"])
            .with_module("B@2.0", []);
        let seeds = coordinates(&["broken@1.0", "A@1.0"]);
        let options = transitive();
        let events: Vec<_> = resolve_closure(&provider, &seeds, &options).collect().await;

        let failures: Vec<_> = events.iter().filter_map(|e| e.as_ref().err()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(**failures[0], ErrorKind::Fetch("broken@1.0".to_string()));
        let Some(Ok(ResolveEvent::Complete(closure))) = events.last() else {
            panic!("stream must end with the closure");
        };
        assert_eq!(keys(closure), vec!["A@1.0", "B@2.0"]);
    }

    #[tokio::test]
    async fn repeated_seed_is_fetched_once() {
        let provider = MockProvider::new().with_module("A@1.0", ["B@2.0"]).with_module("B@2.0", []);
        let closure = resolve(&provider, &coordinates(&["A@1.0", "A@1.0"]), &transitive()).await;
        assert_eq!(keys(&closure), vec!["A@1.0", "B@2.0"]);
        assert_eq!(provider.fetch_count("A@1.0"), 1);
        assert_eq!(provider.fetch_count("B@2.0"), 1);
    }

    #[tokio::test]
    async fn seed_already_in_closure_is_not_refetched() {
        let provider = MockProvider::new().with_module("example.com/a@v1.2.0", []);
        let seeds = coordinates(&["example.com/a@v1.2.0", "example.com/a@v1.2.0", "example.com/a"]);
        let closure = resolve(&provider, &seeds, &ResolveOptions::default()).await;
        assert_eq!(keys(&closure), vec!["example.com/a@v1.2.0"]);
        assert_eq!(provider.fetched(), vec!["example.com/a@v1.2.0", "example.com/a@latest"]);
    }

    #[tokio::test]
    async fn graph_failure_keeps_the_seed() {
        let provider = MockProvider::new().with_module("A@1.0", ["B@2.0"]).with_graph_failure("A@1.0");
        let closure = resolve(&provider, &coordinates(&["A@1.0"]), &transitive()).await;
        assert_eq!(keys(&closure), vec!["A@1.0"]);
    }

    #[tokio::test]
    async fn failed_transitive_fetch_is_left_out() {
        let provider = MockProvider::new()
            .with_module("A@1.0", ["B@2.0", "C@3.0"])
            .with_module("B@2.0", [])
            .with_failure("C@3.0", "checksum mismatch");
        let closure = resolve(&provider, &coordinates(&["A@1.0"]), &transitive()).await;
        assert_eq!(keys(&closure), vec!["A@1.0", "B@2.0"]);
    }

    #[tokio::test]
    async fn shared_dependencies_are_fetched_once() {
        let provider = MockProvider::new()
            .with_module("A@1.0", ["C@3.0", "B@2.0"])
            .with_module("B@2.0", ["C@3.0"])
            .with_module("C@3.0", []);
        let closure = resolve(&provider, &coordinates(&["A@1.0", "B@2.0"]), &transitive()).await;
        assert_eq!(keys(&closure), vec!["A@1.0", "B@2.0", "C@3.0"]);
        // B was queued by A before being resolved as a seed itself.
        assert_eq!(provider.fetch_count("B@2.0"), 1);
        assert_eq!(provider.fetch_count("C@3.0"), 1);
    }

    #[tokio::test]
    async fn cached_modules_are_not_fetched() {
        let provider =
            MockProvider::new().with_module("A@1.0", ["B@2.0"]).with_module("B@2.0", []).with_cached("B@2.0");
        let seeds = coordinates(&["A@1.0"]);
        let options = transitive();
        let events: Vec<_> = resolve_closure(&provider, &seeds, &options).collect().await;
        assert!(events.iter().any(|e| matches!(e, Ok(ResolveEvent::Cached(c)) if c.key() == "B@2.0")));
        assert_eq!(provider.fetch_count("B@2.0"), 0);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(8)]
    #[tokio::test]
    async fn pool_width_is_respected(#[case] workers: usize) {
        let dependencies: Vec<String> = (0..24).map(|n| format!("example.com/dep{n}@v1.0.0")).collect();
        let mut provider = MockProvider::new().with_module("root@v1.0.0", dependencies.iter().map(String::as_str));
        for dependency in &dependencies {
            provider = provider.with_module(dependency, []);
        }
        let options = ResolveOptions { transitive: true, workers, ..ResolveOptions::default() };
        let closure = resolve(&provider, &coordinates(&["root@v1.0.0"]), &options).await;
        assert_eq!(closure.len(), 25);
        assert!(provider.peak_concurrency() <= workers);
    }

    #[tokio::test]
    async fn event_order() {
        let provider = MockProvider::new().with_module("A@1.0", ["B@2.0", "go@1.21"]).with_module("B@2.0", []);
        let seeds = coordinates(&["A@1.0"]);
        let options = transitive();
        let events: Vec<_> = resolve_closure(&provider, &seeds, &options).map(Result::unwrap).collect().await;
        let names: Vec<&str> = events
            .iter()
            .map(|e| match e {
                ResolveEvent::Started { .. } => "started",
                ResolveEvent::SeedResolved(_) => "seed",
                ResolveEvent::Excluded(_) => "excluded",
                ResolveEvent::Queued(_) => "queued",
                ResolveEvent::DiscoveryComplete(_) => "discovered",
                ResolveEvent::Fetched(_) => "fetched",
                ResolveEvent::Cached(_) => "cached",
                ResolveEvent::Complete(_) => "complete",
            })
            .collect();
        assert_eq!(names, vec!["started", "seed", "queued", "excluded", "discovered", "fetched", "complete"]);
    }
}
