//! Republishing of packed module caches.
//!
//! Both targets start by extracting the archive into a scratch directory:
//!
//! - [`FolderPublisher`] rebuilds the proxy layout (`sumdb/**` and
//!   `<path>/@v/{version}.{mod,info,zip}` plus a regenerated `list`) in a
//!   local directory, never overwriting what is already there.
//! - [`jfrog::publish_archive`] hands every extracted module version to an
//!   [`ArtifactUploader`], normally the `jfrog` CLI.
//!
//! Per-item work runs through the bounded worker pool from `gop-asyncutils`;
//! results come back as event streams consumed by a single logger.

mod copy;
pub mod error;
mod folder;
pub mod jfrog;
mod scratch;
mod walk;

pub use crate::copy::{CopyOutcome, SkipReason, copy_new};
pub use crate::folder::{FolderPublisher, FolderReport, PublishEvent, hints, regenerate_list};
pub use crate::jfrog::{ArtifactUploader, JfrogCli, ModuleDir, UploadEvent, UploadReport};
