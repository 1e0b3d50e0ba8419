//! Bulk queuing of a whole directory tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransferError};
use crate::job::TransferJobHandle;

impl TransferJobHandle {
    /// Queues every file under `remote_root`, recursively, mirroring the
    /// relative layout under `local_root`.
    ///
    /// `remote_root` must be a directory reachable through the filesystem
    /// (typically a UNC share). Symlinks are followed; each directory is
    /// visited once and dangling links are skipped. Missing local
    /// directories are created. Returns the number of files queued.
    ///
    /// Every path must be valid UTF-8. A non-UTF-8 path fails with
    /// `InvalidArgument` before any file is queued.
    pub fn add_folder(&self, remote_root: &Path, local_root: &Path) -> Result<usize> {
        if !remote_root.is_dir() {
            return Err(TransferError::InvalidArgument(format!(
                "remote root is not a directory: {}",
                remote_root.display()
            )));
        }
        std::fs::create_dir_all(local_root)?;

        let mut files = Vec::new();
        walk_dir(remote_root, &mut HashSet::new(), &mut files)?;
        files.sort();

        let mut pairs = Vec::with_capacity(files.len());
        for remote in &files {
            let rel_path = remote
                .strip_prefix(remote_root)
                .map_err(std::io::Error::other)?;
            let local = local_root.join(rel_path);
            pairs.push((utf8(remote)?.to_owned(), utf8(&local)?.to_owned(), local));
        }

        for (remote, local_name, local) in &pairs {
            if let Some(parent) = local.parent() {
                std::fs::create_dir_all(parent)?;
            }

            debug!(job = %self.id(), remote = %remote, local = %local_name, "queueing file");
            self.add_file(remote, local_name)?;
        }

        Ok(pairs.len())
    }
}

fn utf8(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        TransferError::InvalidArgument(format!("path is not valid UTF-8: {}", path.display()))
    })
}

fn walk_dir(
    current: &Path,
    visited: &mut HashSet<PathBuf>,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    if !visited.insert(std::fs::canonicalize(current)?) {
        return Ok(());
    }

    for entry in std::fs::read_dir(current)? {
        let path = entry?.path();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            walk_dir(&path, visited, files)?;
        } else if metadata.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
