use crate::Coordinate;

/// Prefixes excluded by default: the toolchain pseudo-modules that show up
/// as graph edges but are not downloadable packages.
pub const DEFAULT_EXCLUDED: &[&str] = &["go@", "toolchain@"];

/// Decides which dependency-graph targets are pseudo-dependencies that must
/// never enter the closure.
///
/// Matching is a plain prefix test against the `path@version` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionFilter {
    prefixes: Vec<String>,
}

impl ExclusionFilter {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { prefixes: prefixes.into_iter().map(Into::into).filter(|p: &String| !p.is_empty()).collect() }
    }

    /// `true` if `target` (`path@version`) starts with any configured prefix.
    ///
    /// ```
    /// use gop_module::ExclusionFilter;
    /// let filter = ExclusionFilter::default();
    /// assert!(filter.is_excluded("go@1.21"));
    /// assert!(filter.is_excluded("toolchain@go1.21.4"));
    /// assert!(!filter.is_excluded("golang.org/x/mod@v0.14.0"));
    /// ```
    pub fn is_excluded(&self, target: &str) -> bool {
        self.prefixes.iter().any(|prefix| target.starts_with(prefix.as_str()))
    }

    pub fn excludes(&self, coordinate: &Coordinate) -> bool {
        self.is_excluded(&coordinate.key())
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED.iter().copied())
    }
}
