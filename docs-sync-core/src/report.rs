//! Run summary and content digest of a published tree.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub destination: PathBuf,
    pub files: usize,
    pub directories: usize,
    /// Entries whose ordering prefix was stripped.
    pub renamed: usize,
    /// Hex SHA-256 over the published tree, see [`tree_digest`].
    pub digest: String,
}

/// Hash every non-directory entry under `root` in sorted relative-path order.
///
/// Each file contributes `path \0 bytes \0`, so both renames and content
/// changes alter the digest. Symlinks are never followed: they contribute
/// their target instead of the bytes behind it. Directories only contribute
/// through the entries they hold.
pub fn tree_digest(root: &Path) -> Result<String, SyncError> {
    let mut entries = Vec::new();
    collect_entries(root, Path::new(""), &mut entries)?;
    entries.sort_by_cached_key(|(rel, _)| path_key(rel));

    let mut hasher = Sha256::new();
    for (rel, is_symlink) in entries {
        let path = root.join(&rel);
        hasher.update(path_key(&rel));
        hasher.update([0u8]);
        if is_symlink {
            let target = fs::read_link(&path).map_err(|e| io_err(&path, e))?;
            hasher.update(b"->");
            hasher.update(os_bytes(target.as_os_str()));
        } else {
            let bytes = fs::read(&path).map_err(|e| io_err(&path, e))?;
            hasher.update(&bytes);
        }
        hasher.update([0u8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_entries(
    root: &Path,
    rel: &Path,
    out: &mut Vec<(PathBuf, bool)>,
) -> Result<(), SyncError> {
    let dir = root.join(rel);
    for entry in fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let child = rel.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
        if file_type.is_dir() {
            collect_entries(root, &child, out)?;
        } else {
            out.push((child, file_type.is_symlink()));
        }
    }
    Ok(())
}

/// Raw bytes of `rel` with `/` separators, stable across platforms.
fn path_key(rel: &Path) -> Vec<u8> {
    let mut key = Vec::new();
    for (i, segment) in rel.iter().enumerate() {
        if i > 0 {
            key.push(b'/');
        }
        key.extend_from_slice(&os_bytes(segment));
    }
    key
}

#[cfg(unix)]
fn os_bytes(s: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn os_bytes(s: &OsStr) -> Vec<u8> {
    s.to_string_lossy().into_owned().into_bytes()
}
