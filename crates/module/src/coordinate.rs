use crate::codec;
use crate::error::{Error, ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Version query used when a coordinate is requested without one.
pub const LATEST: &str = "latest";

/// A module path plus version, e.g. `github.com/BurntSushi/toml@v1.3.2`.
///
/// The path is case-sensitive and otherwise opaque. The version may be empty
/// for graph nodes that represent a main module (they have no version).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub path: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self { path: path.into(), version: version.into() }
    }

    /// Parse `path@version`, splitting on the last `@`. A string without `@`
    /// yields an empty version.
    ///
    /// ```
    /// use gop_module::Coordinate;
    /// let c = Coordinate::parse("github.com/jessevdk/go-flags@v1.4.0").unwrap();
    /// assert_eq!(c.path, "github.com/jessevdk/go-flags");
    /// assert_eq!(c.version, "v1.4.0");
    /// assert_eq!(Coordinate::parse("example.com/main").unwrap().version, "");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (path, version) = match s.rsplit_once('@') {
            Some((path, version)) => (path, version),
            None => (s, ""),
        };
        if path.is_empty() {
            exn::bail!(ErrorKind::InvalidCoordinate(s.to_string()));
        }
        Ok(Self::new(path, version))
    }

    /// Fill in `@latest` when no version was requested.
    #[must_use]
    pub fn versionized(mut self) -> Self {
        if !self.has_version() {
            self.version = LATEST.to_string();
        }
        self
    }

    pub fn has_version(&self) -> bool {
        !self.version.is_empty()
    }

    /// The normalized `path@version` string identifying this coordinate.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Directory name the Go module cache extracts this module into:
    /// `<encoded path>@<encoded version>`.
    pub fn cache_dir_name(&self) -> Result<PathBuf> {
        let path = codec::encode(&self.path)?;
        let version = codec::encode(&self.version)?;
        Ok(PathBuf::from(format!("{path}@{version}")))
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.has_version() {
            true => write!(f, "{}@{}", self.path, self.version),
            false => write!(f, "{}", self.path),
        }
    }
}

impl FromStr for Coordinate {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case("github.com/jessevdk/go-flags@v1.4.0", "github.com/jessevdk/go-flags", "v1.4.0")]
    #[case("  golang.org/x/mod@v0.14.0 \n", "golang.org/x/mod", "v0.14.0")]
    #[case("example.com/main", "example.com/main", "")]
    #[case("go@1.21", "go", "1.21")]
    #[case("example.com/odd@name@v1.0.0", "example.com/odd@name", "v1.0.0")]
    fn test_parse(#[case] input: &str, #[case] path: &str, #[case] version: &str) {
        let coordinate: Coordinate = input.parse().unwrap();
        assert_eq!(coordinate, Coordinate::new(path, version));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("@v1.0.0")]
    fn test_parse_invalid(#[case] input: &str) {
        assert!(Coordinate::parse(input).is_err());
    }

    #[rstest]
    #[case("github.com/jessevdk/go-flags", "github.com/jessevdk/go-flags@latest")]
    #[case("github.com/jessevdk/go-flags@", "github.com/jessevdk/go-flags@latest")]
    #[case("github.com/jessevdk/go-flags@v1.4.0", "github.com/jessevdk/go-flags@v1.4.0")]
    fn test_versionized(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Coordinate::parse(input).unwrap().versionized().key(), expected);
    }

    #[test]
    fn test_display_without_version() {
        assert_eq!(Coordinate::new("example.com/main", "").to_string(), "example.com/main");
    }

    #[test]
    fn test_cache_dir_name() {
        let coordinate = Coordinate::new("github.com/BurntSushi/toml", "v1.3.2");
        assert_eq!(coordinate.cache_dir_name().unwrap(), Path::new("github.com/!burnt!sushi/toml@v1.3.2"));
    }
}
