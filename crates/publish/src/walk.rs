use crate::error::{ErrorKind, Result};
use async_stream::stream;
use futures::Stream;
use std::fs::FileType;
use std::path::{Path, PathBuf};
use tokio::fs;

/// What to do with one directory entry during a walk.
pub(crate) enum Visit<T> {
    /// Yield a work item; directories are not descended into.
    Item(T),
    Descend,
    Skip,
}

/// Depth-first walk below `root`, letting `classify` dispatch every entry.
///
/// Symbolic links are never followed. A directory that can't be read yields
/// an `Err` and the walk continues with its siblings.
pub(crate) fn walk<T, F>(root: PathBuf, mut classify: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(&Path, FileType) -> Visit<T>,
{
    let mut stack = vec![root];
    stream! {
        'dirs: while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) => {
                    yield Err(exn::Exn::from(e).raise(ErrorKind::Walk(current)));
                    continue 'dirs;
                },
            };
            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(e) => {
                        yield Err(exn::Exn::from(e).raise(ErrorKind::Walk(current.clone())));
                        break 'entries;
                    },
                };
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        yield Err(exn::Exn::from(e).raise(ErrorKind::Walk(entry.path())));
                        continue 'entries;
                    },
                };
                let path = entry.path();
                match classify(&path, file_type) {
                    Visit::Item(item) => yield Ok(item),
                    Visit::Descend if file_type.is_dir() => stack.push(path),
                    Visit::Descend | Visit::Skip => {},
                }
            }
        }
    }
}
