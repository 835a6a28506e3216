//! Module coordinates and the data model shared by the packing and
//! publishing pipelines.
//!
//! - [`Coordinate`]: a module path plus version.
//! - [`ClosureSet`]: deduplicated set of coordinates keyed by `path@version`.
//! - [`ModuleRecord`] / [`DependencyEdge`]: what the external resolver reports.
//! - [`ExclusionFilter`]: pseudo-dependencies that never enter a closure.
//! - [`codec`]: the case-folding path encoding used by the module cache and
//!   proxy layout.

mod closure;
pub mod codec;
mod coordinate;
pub mod error;
mod exclude;
mod record;

pub use crate::closure::ClosureSet;
pub use crate::coordinate::{Coordinate, LATEST};
pub use crate::exclude::{DEFAULT_EXCLUDED, ExclusionFilter};
pub use crate::record::{DependencyEdge, ModuleRecord};

/// Directory-name suffix marking a directory that holds every version of one
/// module path.
pub const VERSION_DIR_SUFFIX: &str = "@v";
/// Extension of module descriptor files inside a version directory.
pub const DESCRIPTOR_EXT: &str = "mod";
/// Name of the checksum-database subtree in the download cache.
pub const SUMDB_DIR: &str = "sumdb";
