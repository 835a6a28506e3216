//! Small async building blocks shared by the pipeline crates.
//!
//! The only thing in here right now is [`Bounded`]: a fixed-width worker pool
//! expressed as a [`Stream`](futures::Stream) adapter. Every fan-out stage
//! (closure expansion, folder republishing, artifact uploads) drains its work
//! queue through one of these so that the number of in-flight operations never
//! depends on how much work was discovered.

mod bounded;

pub use crate::bounded::{Bounded, BoundedExt};

/// Default pool width for stages that shell out to external tools.
pub const DEFAULT_WORKERS: usize = 8;
