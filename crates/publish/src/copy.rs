use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Why a destination file was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Exists,
    /// The destination could not be inspected.
    Stat(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SkipReason::Exists => write!(f, "file exists"),
            SkipReason::Stat(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(u64),
    Skipped(SkipReason),
}

/// Copy `source` to `dest` unless something is already at `dest`.
///
/// Never overwrites: the destination is created with exclusive-create
/// semantics, so a file appearing between the check and the copy is kept as
/// well. Missing parent directories are created. A copy that fails half-way
/// removes its partial output, otherwise later runs would skip it forever.
pub async fn copy_new(source: &Path, dest: &Path) -> Result<CopyOutcome> {
    match fs::symlink_metadata(dest).await {
        Ok(_) => return Ok(CopyOutcome::Skipped(SkipReason::Exists)),
        Err(e) if e.kind() == IoErrorKind::NotFound => {},
        Err(e) => return Ok(CopyOutcome::Skipped(SkipReason::Stat(e.to_string()))),
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Copy(dest.to_path_buf()))?;
    }
    let mut input = File::open(source).await.or_raise(|| ErrorKind::Copy(source.to_path_buf()))?;
    let mut output = match OpenOptions::new().write(true).create_new(true).open(dest).await {
        Ok(output) => output,
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => return Ok(CopyOutcome::Skipped(SkipReason::Exists)),
        Err(e) => return Err(exn::Exn::from(e).raise(ErrorKind::Copy(dest.to_path_buf()))),
    };
    let copied = match tokio::io::copy(&mut input, &mut output).await {
        Ok(bytes) => output.flush().await.map(|()| bytes),
        Err(e) => Err(e),
    };
    match copied {
        Ok(bytes) => Ok(CopyOutcome::Copied(bytes)),
        Err(e) => {
            drop(output);
            let _ = fs::remove_file(dest).await;
            Err(exn::Exn::from(e).raise(ErrorKind::Copy(dest.to_path_buf())))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    #[tokio::test]
    async fn copies_into_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("v1.0.0.zip");
        std_fs::write(&source, b"zip bytes").unwrap();
        let dest = dir.path().join("out/example.com/a/@v/v1.0.0.zip");

        assert_eq!(copy_new(&source, &dest).await.unwrap(), CopyOutcome::Copied(9));
        assert_eq!(std_fs::read(&dest).unwrap(), b"zip bytes");
    }

    #[tokio::test]
    async fn never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("new");
        let dest = dir.path().join("old");
        std_fs::write(&source, b"new").unwrap();
        std_fs::write(&dest, b"old").unwrap();

        assert_eq!(copy_new(&source, &dest).await.unwrap(), CopyOutcome::Skipped(SkipReason::Exists));
        assert_eq!(std_fs::read(&dest).unwrap(), b"old");
    }

    #[tokio::test]
    async fn missing_source_fails_without_leaving_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        let err = copy_new(&dir.path().join("missing"), &dest).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Copy(_)));
        assert!(!dest.exists());
    }
}
