//! Module Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A module error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for module operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The coordinate string has no module path.
    #[display("invalid coordinate: {_0:?}")]
    InvalidCoordinate(#[error(not(source))] String),
    /// The path already contains the escape marker, so it cannot be encoded
    /// without becoming ambiguous.
    #[display("path contains escape marker: {_0}")]
    EscapeMarker(#[error(not(source))] String),
    /// The string is not a valid case-folded path (dangling marker, marker
    /// not followed by a lower-case letter, or a bare upper-case letter).
    #[display("invalid encoded path: {_0}")]
    InvalidEncoding(#[error(not(source))] String),
    /// Output from the external resolver could not be decoded.
    #[display("malformed module record")]
    MalformedRecord,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidCoordinate("@v1".to_string()).to_string(), "invalid coordinate: \"@v1\"");
        assert_eq!(ErrorKind::EscapeMarker("a!b".to_string()).to_string(), "path contains escape marker: a!b");
        assert_eq!(ErrorKind::MalformedRecord.to_string(), "malformed module record");
    }
}
