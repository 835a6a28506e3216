//! Case-folding path codec.
//!
//! Module paths are case-sensitive, but the module cache and proxy layout have
//! to survive case-insensitive filesystems. Every upper-case ASCII letter is
//! written as [`ESCAPE_MARKER`] followed by its lower-case form, so
//! `github.com/BurntSushi/toml` is stored as `github.com/!burnt!sushi/toml`.
//!
//! Only ASCII letters are folded; anything else passes through untouched. The
//! marker is not a legal character in module paths, so a path that already
//! contains one is rejected instead of being silently double-escaped.

use crate::error::{ErrorKind, Result};

/// Character introducing an escaped upper-case letter.
pub const ESCAPE_MARKER: char = '!';

/// Encode a case-sensitive module path into its filesystem-safe form.
///
/// # Errors
/// Returns [`ErrorKind::EscapeMarker`] if `path` already contains
/// [`ESCAPE_MARKER`].
///
/// # Examples
///
/// ```
/// use gop_module::codec::encode;
/// assert_eq!(encode("github.com/BurntSushi/toml").unwrap(), "github.com/!burnt!sushi/toml");
/// assert!(encode("github.com/a!b").is_err());
/// ```
pub fn encode(path: &str) -> Result<String> {
    if path.contains(ESCAPE_MARKER) {
        exn::bail!(ErrorKind::EscapeMarker(path.to_string()));
    }
    let mut encoded = String::with_capacity(path.len() + path.len() / 4);
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            encoded.push(ESCAPE_MARKER);
            encoded.push(c.to_ascii_lowercase());
        } else {
            encoded.push(c);
        }
    }
    Ok(encoded)
}

/// Decode a filesystem-safe path back into the original module path.
///
/// # Errors
/// Returns [`ErrorKind::InvalidEncoding`] for a trailing marker, a marker not
/// followed by a lower-case ASCII letter, or an upper-case ASCII letter that
/// was never escaped.
///
/// # Examples
///
/// ```
/// use gop_module::codec::decode;
/// assert_eq!(decode("github.com/!burnt!sushi/toml").unwrap(), "github.com/BurntSushi/toml");
/// assert!(decode("github.com/trailing!").is_err());
/// ```
pub fn decode(encoded: &str) -> Result<String> {
    let invalid = || ErrorKind::InvalidEncoding(encoded.to_string());
    let mut decoded = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE_MARKER => match chars.next() {
                Some(next) if next.is_ascii_lowercase() => decoded.push(next.to_ascii_uppercase()),
                _ => exn::bail!(invalid()),
            },
            c if c.is_ascii_uppercase() => exn::bail!(invalid()),
            c => decoded.push(c),
        }
    }
    Ok(decoded)
}
