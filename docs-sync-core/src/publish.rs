//! Replace the destination content directory with the normalized subtree.
//!
//! [`publish`] copies into a staging directory beside the destination first,
//! then removes the old destination and renames the staging directory into
//! place. A failed copy therefore leaves the previously published tree intact.

use std::fs;
use std::path::Path;

use tracing::{debug, error, info};

use crate::error::{io_err, SyncError};

/// Counts of what a copy wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub files: usize,
    pub directories: usize,
}

/// Recursively delete `dest` if it exists.
pub fn invalidate_destination(dest: &Path) -> Result<(), SyncError> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(dest).map_err(|e| io_err(dest, e))?;
            debug!(path = %dest.display(), "Removed destination directory");
        }
        Ok(_) => {
            fs::remove_file(dest).map_err(|e| io_err(dest, e))?;
            debug!(path = %dest.display(), "Removed destination file");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(dest, e)),
    }
    Ok(())
}

/// Copy the tree at `src` into `dest`, creating `dest` and any intermediate
/// directories. Existing files at the same paths are overwritten.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<TreeStats, SyncError> {
    let mut stats = TreeStats::default();
    fs::create_dir_all(dest).map_err(|e| io_err(dest, e))?;
    copy_dir(src, dest, &mut stats)?;
    Ok(stats)
}

fn copy_dir(src: &Path, dest: &Path, stats: &mut TreeStats) -> Result<(), SyncError> {
    for entry in fs::read_dir(src).map_err(|e| io_err(src, e))? {
        let entry = entry.map_err(|e| io_err(src, e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| io_err(&from, e))?;

        if file_type.is_dir() {
            if to.is_file() {
                fs::remove_file(&to).map_err(|e| io_err(&to, e))?;
            }
            fs::create_dir_all(&to).map_err(|e| io_err(&to, e))?;
            stats.directories += 1;
            copy_dir(&from, &to, stats)?;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
            stats.files += 1;
        } else {
            if to.is_dir() {
                fs::remove_dir_all(&to).map_err(|e| io_err(&to, e))?;
            }
            fs::copy(&from, &to).map_err(|e| {
                error!(error = ?e, from = %from.display(), to = %to.display(), "Failed to copy file");
                io_err(&to, e)
            })?;
            stats.files += 1;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), SyncError> {
    let target = fs::read_link(from).map_err(|e| io_err(from, e))?;
    if fs::symlink_metadata(to).is_ok() {
        invalidate_destination(to)?;
    }
    std::os::unix::fs::symlink(&target, to).map_err(|e| io_err(to, e))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), SyncError> {
    fs::copy(from, to).map(|_| ()).map_err(|e| io_err(to, e))
}

/// Replace `dest` with a copy of `src`.
///
/// Equivalent to [`invalidate_destination`] followed by [`copy_tree`], except
/// that the copy is staged in `dest`'s parent directory first.
pub fn publish(src: &Path, dest: &Path) -> Result<TreeStats, SyncError> {
    let parent = match dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;

    let staging = tempfile::Builder::new()
        .prefix(".docs-sync-staging-")
        .tempdir_in(parent)
        .map_err(|e| {
            error!(error = ?e, path = %parent.display(), "Failed to create staging directory");
            io_err(parent, e)
        })?;
    debug!(path = %staging.path().display(), "Staging published tree");

    let stats = copy_tree(src, staging.path())?;
    // Staging dirs are created owner-only; publish with the source's mode.
    let permissions = fs::metadata(src).map_err(|e| io_err(src, e))?.permissions();
    fs::set_permissions(staging.path(), permissions).map_err(|e| io_err(staging.path(), e))?;

    invalidate_destination(dest)?;
    // `keep` disarms the cleanup guard; from here the staging dir is the
    // destination.
    let staged = staging.keep();
    if let Err(e) = fs::rename(&staged, dest) {
        error!(error = ?e, from = %staged.display(), to = %dest.display(), "Failed to move staged tree into place");
        let _ = fs::remove_dir_all(&staged);
        return Err(io_err(dest, e));
    }

    info!(
        path = %dest.display(),
        files = stats.files,
        directories = stats.directories,
        "Published destination"
    );
    Ok(stats)
}
