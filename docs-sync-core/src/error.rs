//! Error types for docs-sync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise during a synchronisation run.
///
/// None of these are recovered locally: every variant aborts the run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The external command could not be started at all (e.g. git not on PATH).
    #[error("failed to launch `{command}`: {source}")]
    CommandLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external command ran but exited unsuccessfully.
    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The checkout completed but the requested subtree is not in the cache.
    #[error("subtree `{subtree}` not found in checkout at {cache_dir}")]
    SubtreeMissing { subtree: String, cache_dir: PathBuf },

    /// Two siblings would end up with the same name after prefix stripping.
    #[error("name collision in {directory}: `{first}` and `{second}` both normalize to `{name}`")]
    NameCollision {
        directory: PathBuf,
        name: String,
        first: String,
        second: String,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
