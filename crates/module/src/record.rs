use crate::Coordinate;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Deserialize;
use std::path::PathBuf;

/// Result of resolving one coordinate through the external resolver.
///
/// Field names follow the JSON emitted by `go mod download -json`. A record
/// with a non-empty [`error`](Self::error) is a failed resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModuleRecord {
    pub path: String,
    pub version: String,
    /// Extracted source root inside the module cache.
    pub dir: Option<PathBuf>,
    /// Cached `.info` file.
    pub info: Option<PathBuf>,
    #[serde(rename = "GoMod")]
    pub mod_file: Option<PathBuf>,
    #[serde(rename = "Zip")]
    pub zip_file: Option<PathBuf>,
    pub sum: Option<String>,
    #[serde(rename = "GoModSum")]
    pub mod_sum: Option<String>,
    pub error: Option<String>,
}

impl ModuleRecord {
    /// Decode a single record from resolver output.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).or_raise(|| ErrorKind::MalformedRecord)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.path, &self.version)
    }

    /// The resolution error message, if any.
    pub fn failure(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }
}

/// One `from to` line of a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub from: Coordinate,
    pub to: Coordinate,
}

impl DependencyEdge {
    /// Parse graph output (`from to` pairs, one per line).
    ///
    /// Lines that do not hold exactly two fields, or whose fields are not
    /// coordinates, are ignored.
    ///
    /// ```
    /// use gop_module::DependencyEdge;
    /// let edges = DependencyEdge::parse_graph("example.com/a@v1.0 example.com/b@v2.0\ngarbage\n");
    /// assert_eq!(edges.len(), 1);
    /// assert_eq!(edges[0].to.key(), "example.com/b@v2.0");
    /// ```
    pub fn parse_graph(output: &str) -> Vec<Self> {
        output.lines().filter_map(Self::parse_line).collect()
    }

    fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let (from, to) = match (fields.next(), fields.next(), fields.next()) {
            (Some(from), Some(to), None) => (from, to),
            _ => return None,
        };
        match (Coordinate::parse(from), Coordinate::parse(to)) {
            (Ok(from), Ok(to)) => Some(Self { from, to }),
            _ => {
                tracing::debug!(line, "Ignoring unparsable dependency graph line");
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOWNLOAD_JSON: &str = r#"{
        "Path": "github.com/jessevdk/go-flags",
        "Version": "v1.4.0",
        "Info": "/tmp/gop_1/modcache/cache/download/github.com/jessevdk/go-flags/@v/v1.4.0.info",
        "GoMod": "/tmp/gop_1/modcache/cache/download/github.com/jessevdk/go-flags/@v/v1.4.0.mod",
        "Zip": "/tmp/gop_1/modcache/cache/download/github.com/jessevdk/go-flags/@v/v1.4.0.zip",
        "Dir": "/tmp/gop_1/modcache/github.com/jessevdk/go-flags@v1.4.0",
        "Sum": "h1:4KAAxkbs5qKvNTtK4Qf1WfA1SYB0Y6uE0HwPK1zVpbI=",
        "GoModSum": "h1:4KAAxkbs5qKvNTtK4Qf1WfA1SYB0Y6uE0HwPK1zVpbI="
    }"#;

    #[test]
    fn test_record_from_json() {
        let record = ModuleRecord::from_json(DOWNLOAD_JSON.as_bytes()).unwrap();
        assert_eq!(record.coordinate(), Coordinate::new("github.com/jessevdk/go-flags", "v1.4.0"));
        assert_eq!(record.failure(), None);
        assert_eq!(
            record.dir.as_deref(),
            Some(std::path::Path::new("/tmp/gop_1/modcache/github.com/jessevdk/go-flags@v1.4.0"))
        );
        assert!(record.mod_file.is_some());
        assert!(record.zip_file.is_some());
        assert!(record.sum.is_some());
    }

    #[test]
    fn test_failed_record() {
        let json = r#"{"Path": "example.com/nope", "Version": "latest", "Error": "module not found"}"#;
        let record = ModuleRecord::from_json(json.as_bytes()).unwrap();
        assert_eq!(record.failure(), Some("module not found"));
    }

    #[test]
    fn test_malformed_record() {
        let err = ModuleRecord::from_json(b"go: downloading nothing").unwrap_err();
        assert_eq!(*err, ErrorKind::MalformedRecord);
    }

    #[test]
    fn test_parse_graph() {
        let output = "\
example.com/a@v1.0.0 example.com/b@v2.0.0
example.com/a@v1.0.0 go@1.21

example.com/a@v1.0.0 too many fields
example.com/a@v1.0.0 @broken
";
        let edges = DependencyEdge::parse_graph(output);
        let targets: Vec<_> = edges.iter().map(|e| e.to.key()).collect();
        assert_eq!(targets, vec!["example.com/b@v2.0.0", "go@1.21"]);
        assert_eq!(edges[0].from, Coordinate::new("example.com/a", "v1.0.0"));
    }

    #[test]
    fn test_parse_graph_main_module() {
        let edges = DependencyEdge::parse_graph("example.com/main golang.org/x/mod@v0.14.0");
        assert_eq!(edges.len(), 1);
        assert!(!edges[0].from.has_version());
    }
}
