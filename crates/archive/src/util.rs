use crate::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Component, Path};
use std::time::SystemTime;
use time::{OffsetDateTime, PrimitiveDateTime};
use zip::CompressionMethod;

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for Compression {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl Compression {
    /// Returns the short name for configuration (for displaying to user)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Stored => "stored",
            Compression::Deflate => "deflate",
            Compression::Bzip2 => "bzip2",
            #[cfg(feature = "zstd")]
            Compression::Zstd => "zstd",
        }
    }

    #[must_use]
    pub(crate) fn method(&self) -> CompressionMethod {
        match self {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflate => CompressionMethod::Deflated,
            Compression::Bzip2 => CompressionMethod::Bzip2,
            #[cfg(feature = "zstd")]
            Compression::Zstd => CompressionMethod::Zstd,
        }
    }

    // Archives are built once and carried across an air gap; favour size.
    #[must_use]
    pub(crate) fn level(&self) -> Option<i64> {
        match self {
            Compression::Stored => None,
            Compression::Deflate | Compression::Bzip2 => Some(9),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Some(19),
        }
    }
}

/// Forward-slash entry name for `path` relative to `root`.
pub(crate) fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {},
            _ => return None,
        }
    }
    match parts.is_empty() {
        true => None,
        false => Some(parts.join("/")),
    }
}

/// Zip timestamps carry no zone; they are written and read as UTC.
pub(crate) fn to_zip_time(modified: SystemTime) -> Option<zip::DateTime> {
    let utc = OffsetDateTime::from(modified);
    zip::DateTime::try_from(PrimitiveDateTime::new(utc.date(), utc.time())).ok()
}

pub(crate) fn from_zip_time(modified: zip::DateTime) -> Option<SystemTime> {
    let primitive = PrimitiveDateTime::try_from(modified).ok()?;
    Some(primitive.assume_utc().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case("/cache", "/cache/sumdb/sum.golang.org/lookup/x", Some("sumdb/sum.golang.org/lookup/x"))]
    #[case("/cache", "/cache/file.zip", Some("file.zip"))]
    #[case("/cache", "/cache", None)]
    #[case("/cache", "/elsewhere/file.zip", None)]
    fn test_entry_name(#[case] root: &str, #[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(entry_name(Path::new(root), Path::new(path)).as_deref(), expected);
    }

    #[test]
    fn test_zip_time_roundtrip() {
        // 2024-01-02T03:04:06Z, an even second so DOS time keeps it exactly.
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_164_646);
        let zipped = to_zip_time(modified).unwrap();
        assert_eq!(from_zip_time(zipped), Some(modified));
    }

    #[test]
    fn test_zip_time_before_dos_epoch() {
        assert!(to_zip_time(SystemTime::UNIX_EPOCH).is_none());
    }
}
