//! Publish Error Types
//!
//! Setup failures (output path, scratch directory, extraction, external tool)
//! are returned from the top-level publish calls. Failures of single files,
//! modules or uploads are yielded as `Err` items by the event streams and
//! never stop the batch.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The output path exists and is not a directory.
    #[display("output is not a directory: {}", _0.display())]
    NotADirectory(#[error(not(source))] PathBuf),
    /// The output directory could not be created or inspected.
    #[display("failed to prepare output directory: {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    #[display("failed to create scratch directory")]
    WorkDir,
    #[display("failed to extract archive")]
    Extract,
    /// The archive holds no module download cache.
    #[display("archive contains no cache/download directory")]
    MissingDownloadCache,
    #[display("failed to read directory: {}", _0.display())]
    Walk(#[error(not(source))] PathBuf),
    #[display("failed to copy file: {}", _0.display())]
    Copy(#[error(not(source))] PathBuf),
    #[display("failed to update list file: {}", _0.display())]
    Index(#[error(not(source))] PathBuf),
    #[display("missing {_0} binary: install it or specify the path to it")]
    BinaryNotFound(#[error(not(source))] String),
    #[display("jfrog is not configured")]
    NotConfigured,
    #[display("command failed: {_0}")]
    Command(#[error(not(source))] String),
    #[display("invalid module directory: {_0}")]
    InvalidModuleDir(#[error(not(source))] String),
    #[display("failed to publish module {_0}")]
    Upload(#[error(not(source))] String),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Copy(_) | ErrorKind::Index(_) | ErrorKind::Upload(_) | ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::NotADirectory(PathBuf::from("mirror.txt")).to_string(),
            "output is not a directory: mirror.txt"
        );
        assert_eq!(ErrorKind::NotConfigured.to_string(), "jfrog is not configured");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Upload("example.com/a@v1.0.0".to_string()).is_retryable());
        assert!(!ErrorKind::NotConfigured.is_retryable());
        assert!(!ErrorKind::InvalidModuleDir(String::new()).is_retryable());
    }
}
