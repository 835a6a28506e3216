//! Portable module-cache archives.
//!
//! The packing side walks a cache directory and writes every regular file into
//! a single zip container ([`pack`]); the publishing side extracts it again
//! ([`unpack`]). Entry names are forward-slash paths relative to the packed
//! directory and modification times survive the round trip (at the two-second
//! resolution zip offers).
//!
//! Both operations are best-effort over individual files: a file that can't be
//! read or written is logged and skipped. Only failures that affect the
//! archive as a whole (it already exists, it can't be opened or finalized)
//! are returned as errors.
//!
//! Entry compression is selected with [`Compression`]. Stored, Deflate and
//! Bzip2 are always available, Zstd is behind the `zstd` feature.

mod construct;
pub mod error;
mod pack;
mod unpack;
mod util;

pub use crate::pack::{PackStats, pack};
pub use crate::unpack::{UnpackStats, unpack};

/// Compression method applied to each archive entry.
///
/// Defaults to [`Deflate`](Self::Deflate), which every zip tool can read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// No compression.
    Stored,
    /// Deflate, readable everywhere.
    #[default]
    Deflate,
    /// Bzip2; smaller, slower, less widely supported.
    Bzip2,
    /// Zstd (requires the `zstd` feature).
    #[cfg(feature = "zstd")]
    Zstd,
}
