//! Dependency-closure resolution.
//!
//! A [`CacheProvider`] downloads single modules and reports their dependency
//! graphs; [`GoToolchain`] is the real one, driving `go mod download` and
//! `go mod graph` against an isolated cache inside a [`WorkDir`].
//! [`resolve_closure`] expands a seed set into the deduplicated,
//! exclusion-filtered closure, fetching transitive modules through a bounded
//! worker pool.

pub mod error;
mod go;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod provider;
mod resolve;
mod workdir;

pub use crate::go::{GoToolchain, locate_binary};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockProvider;
pub use crate::provider::CacheProvider;
pub use crate::resolve::{ResolveEvent, ResolveOptions, resolve, resolve_closure};
pub use crate::workdir::{GO_MOD_TEMPLATE, WorkDir};
