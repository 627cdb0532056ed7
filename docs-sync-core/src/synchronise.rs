//! High-level pipeline: reset cache → sparse checkout → normalize → publish.
//!
//! This module provides the top-level orchestration for one docs synchronisation run.
//! Given a [`SyncConfig`] and a [`CommandRunner`], it:
//!   - Deletes the cache directory left by any previous run
//!   - Clones only the latest commit of the remote, restricted to the configured subtree
//!   - Strips ordering prefixes (`01-`, `10-`, ...) from every name below the subtree
//!   - Replaces the destination directory with the normalized subtree
//!   - Returns a [`SyncReport`] with counts and a digest of the published tree
//!
//! # Responsibilities
//! - Strictly sequential, fail-fast orchestration: the first failing step aborts the run
//! - Steps before publishing only touch the cache, so a failure there leaves the
//!   destination exactly as it was
//! - Logs every step via tracing for traceability
//!
//! # Concurrency
//! A run assumes exclusive ownership of both the cache and the destination. Nothing is
//! locked; two concurrent runs against the same directories are undefined.
//!
//! # Error Handling
//! Every failure is returned as a [`SyncError`] after being logged. Nothing is retried
//! and nothing is rolled back; the cache is left in place for inspection.

use tracing::{error, info};

use crate::config::SyncConfig;
use crate::contract::CommandRunner;
use crate::download;
use crate::error::SyncError;
use crate::normalize;
use crate::publish;
use crate::report::{tree_digest, SyncReport};

pub async fn synchronise<R>(config: &SyncConfig, runner: &R) -> Result<SyncReport, SyncError>
where
    R: CommandRunner + ?Sized,
{
    info!(
        repo_url = %config.source.repo_url,
        subtree = %config.source.subtree_path,
        "[SYNC] Starting docs synchronisation"
    );

    let result = run_steps(config, runner).await;
    match &result {
        Ok(report) => info!(
            files = report.files,
            renamed = report.renamed,
            digest = %report.digest,
            "[SYNC] Synchronisation complete"
        ),
        Err(e) => error!(error = %e, "[SYNC][ERROR] Synchronisation failed"),
    }
    result
}

async fn run_steps<R>(config: &SyncConfig, runner: &R) -> Result<SyncReport, SyncError>
where
    R: CommandRunner + ?Sized,
{
    // --- Step 1: Reset cache ---
    download::reset_cache(&config.cache_dir)?;
    info!(path = %config.cache_dir.display(), "[SYNC] Cache reset");

    // --- Step 2: Shallow, path-filtered checkout ---
    let subtree = download::sparse_checkout(runner, &config.source, &config.cache_dir).await?;
    info!(path = %subtree.display(), "[SYNC] Checkout succeeded");

    // --- Step 3: Normalize names ---
    let plan = normalize::normalize_tree(&subtree)?;
    info!(renamed = plan.len(), "[SYNC] Names normalized");

    // --- Steps 4 & 5: Invalidate and replace destination ---
    let stats = publish::publish(&subtree, &config.dest_dir)?;

    let digest = tree_digest(&config.dest_dir)?;
    Ok(SyncReport {
        destination: config.dest_dir.clone(),
        files: stats.files,
        directories: stats.directories,
        renamed: plan.len(),
        digest,
    })
}
