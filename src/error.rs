use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors; each one ends the process with a non-zero exit code.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("failed to load configuration")]
    Config,
    #[display("archive already exists: {}", _0.display())]
    ArchiveExists(#[error(not(source))] PathBuf),
    #[display("failed to pack dependencies")]
    Pack,
    #[display("failed to publish archive")]
    Publish,
}
