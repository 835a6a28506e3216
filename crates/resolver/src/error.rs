//! Resolver Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required external binary is not installed (or the configured path is
    /// not an executable file).
    #[display("missing {_0} binary: install it or specify the path to it")]
    BinaryNotFound(#[error(not(source))] String),
    /// The scratch working directory could not be prepared.
    #[display("failed to prepare working directory")]
    WorkDir,
    /// An external command could not be run, or exited unsuccessfully.
    #[display("command failed: {_0}")]
    Command(#[error(not(source))] String),
    /// The external resolver produced output that could not be decoded.
    #[display("malformed resolver output")]
    MalformedOutput,
    /// The external resolver reported an error for the module.
    #[display("resolver reported: {_0}")]
    Resolution(#[error(not(source))] String),
    /// The record has no extracted source directory to read a graph from.
    #[display("no source directory for {_0}")]
    MissingSourceDir(#[error(not(source))] String),
    #[display("failed to fetch module {_0}")]
    Fetch(#[error(not(source))] String),
    #[display("failed to read dependency graph of {_0}")]
    Graph(#[error(not(source))] String),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Fetches and graph queries go over the network; a missing binary or a
    /// module the resolver rejected won't fix itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Command(_) | ErrorKind::Fetch(_) | ErrorKind::Graph(_) | ErrorKind::Io)
    }
}
