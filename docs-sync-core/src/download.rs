//! Cache reset and shallow, path-filtered checkout of the remote source.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::RemoteSource;
use crate::contract::{CommandOutput, CommandRunner, GitCommand};
use crate::error::{io_err, SyncError};

/// Remove the cache directory if it exists, and make sure its parent does.
pub fn reset_cache(cache_dir: &Path) -> Result<(), SyncError> {
    if cache_dir.exists() {
        fs::remove_dir_all(cache_dir).map_err(|e| {
            error!(error = ?e, path = %cache_dir.display(), "Failed to remove existing cache dir");
            io_err(cache_dir, e)
        })?;
        debug!(path = %cache_dir.display(), "Removed existing cache dir");
    } else if let Some(parent) = cache_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            error!(error = ?e, path = %parent.display(), "Failed to create cache parent directory");
            io_err(parent, e)
        })?;
    }
    Ok(())
}

/// The three git invocations making up a checkout: clone, sparse-checkout, checkout.
pub fn checkout_commands(source: &RemoteSource, cache_dir: &Path) -> Vec<GitCommand> {
    let cache = cache_dir.to_string_lossy().into_owned();

    let mut clone = vec![
        "clone".to_string(),
        "--depth".into(),
        "1".into(),
        "--filter=blob:none".into(),
        "--sparse".into(),
    ];
    if let Some(reference) = &source.reference {
        clone.push("--branch".into());
        clone.push(reference.clone());
    }
    clone.push("--".into());
    clone.push(source.repo_url.clone());
    clone.push(cache.clone());

    let sparse = vec![
        "-C".to_string(),
        cache.clone(),
        "sparse-checkout".into(),
        "set".into(),
        source.subtree_dir().to_string(),
    ];

    let mut checkout = vec!["-C".to_string(), cache, "checkout".into()];
    if let Some(reference) = &source.reference {
        checkout.push(reference.clone());
    }

    vec![
        GitCommand::new(clone),
        GitCommand::new(sparse),
        GitCommand::new(checkout),
    ]
}

/// Run one command and turn a non-zero exit into [`SyncError::CommandFailed`].
pub(crate) async fn run_checked<R>(runner: &R, command: GitCommand) -> Result<CommandOutput, SyncError>
where
    R: CommandRunner + ?Sized,
{
    let label = command.to_string();
    let output = runner.run(command).await?;
    if output.is_success() {
        debug!(command = %label, "Command succeeded");
        Ok(output)
    } else {
        error!(
            command = %label,
            status = output.status,
            stderr = %output.stderr.trim(),
            "Command exited with non-zero code"
        );
        Err(SyncError::CommandFailed {
            command: label,
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Fetch only the latest commit of `source`, restricted to its subtree, into
/// `cache_dir`. Returns the path of the subtree inside the cache.
///
/// The cache must not exist beforehand (see [`reset_cache`]); git refuses to
/// clone into a non-empty directory.
pub async fn sparse_checkout<R>(
    runner: &R,
    source: &RemoteSource,
    cache_dir: &Path,
) -> Result<PathBuf, SyncError>
where
    R: CommandRunner + ?Sized,
{
    for command in checkout_commands(source, cache_dir) {
        run_checked(runner, command).await?;
    }

    let subtree = source.checkout_path(cache_dir);
    if !subtree.is_dir() {
        error!(
            subtree = %source.subtree_path,
            cache_dir = %cache_dir.display(),
            "Checkout did not produce the requested subtree"
        );
        return Err(SyncError::SubtreeMissing {
            subtree: source.subtree_path.clone(),
            cache_dir: cache_dir.to_path_buf(),
        });
    }

    info!(
        repo_url = %source.repo_url,
        reference = source.reference.as_deref().unwrap_or("<default>"),
        path = %subtree.display(),
        "Checked out subtree"
    );
    Ok(subtree)
}
