/// `load_config` module: Loads a static YAML config file and adapts it into the core `SyncConfig`.
///
/// This module is the only place where user-supplied YAML is parsed and mapped to the
/// strongly-typed configuration of `docs-sync-core`.
///
/// # Responsibilities
/// - Parse the YAML configuration file into type-safe Rust structs
/// - Resolve relative `cache_dir` / `dest_dir` against the directory holding the config file,
///   which is treated as the project root
/// - Apply command-line overrides on top of the file values
/// - Ensure clear diagnostics: any failure in loading results in an error naming the file
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
///
/// ---
///
/// Internal implementation begins below.
///
use anyhow::{bail, Context, Result};
use docs_sync_core::config::{
    RemoteSource, SyncConfig, DEFAULT_CACHE_DIR, DEFAULT_GIT_PROGRAM,
};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "docs-sync.yaml";

#[derive(Debug, Deserialize)]
pub struct FileConfig {
    pub source: SourceSection,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    pub dest_dir: PathBuf,
    #[serde(default)]
    pub git_program: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SourceSection {
    pub repo_url: String,
    pub subtree_path: String,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Values given on the command line; each one replaces the file's value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub repo_url: Option<String>,
    pub subtree_path: Option<String>,
    pub reference: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
}

/// Loads the YAML config at `path` and resolves it into a [`SyncConfig`].
pub fn load_config<P: AsRef<Path>>(path: P, overrides: &Overrides) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: FileConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let project_root = path_ref
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let config = resolve(raw, project_root, overrides)?;
    config.trace_loaded();
    Ok(config)
}

/// Merge file values, overrides and defaults. Relative paths from the file are
/// joined onto `project_root`; relative override paths are kept relative to the
/// current directory, like any other command-line path.
pub fn resolve(raw: FileConfig, project_root: &Path, overrides: &Overrides) -> Result<SyncConfig> {
    let anchor = |p: PathBuf| {
        if p.is_absolute() {
            p
        } else {
            project_root.join(p)
        }
    };

    let source = RemoteSource {
        repo_url: overrides.repo_url.clone().unwrap_or(raw.source.repo_url),
        subtree_path: overrides
            .subtree_path
            .clone()
            .unwrap_or(raw.source.subtree_path),
        reference: overrides.reference.clone().or(raw.source.reference),
    };

    if source.repo_url.trim().is_empty() {
        error!("source.repo_url is empty");
        bail!("source.repo_url must not be empty");
    }
    if source.subtree_path.trim_matches('/').trim().is_empty() {
        error!("source.subtree_path is empty");
        bail!("source.subtree_path must name a directory inside the repository");
    }

    let cache_dir = match &overrides.cache_dir {
        Some(dir) => dir.clone(),
        None => anchor(
            raw.cache_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
        ),
    };
    let dest_dir = match &overrides.dest_dir {
        Some(dir) => dir.clone(),
        None => anchor(raw.dest_dir),
    };

    // Both directories are deleted wholesale on every run.
    let cache_abs = lexical_absolute(&cache_dir)?;
    let dest_abs = lexical_absolute(&dest_dir)?;
    if cache_abs.starts_with(&dest_abs) || dest_abs.starts_with(&cache_abs) {
        error!(
            cache_dir = %cache_dir.display(),
            dest_dir = %dest_dir.display(),
            "cache_dir and dest_dir overlap"
        );
        bail!(
            "cache_dir {:?} and dest_dir {:?} must not contain one another",
            cache_dir,
            dest_dir
        );
    }
    if dest_dir.parent().is_none() {
        bail!("dest_dir {:?} must not be a filesystem root", dest_dir);
    }

    Ok(SyncConfig {
        source,
        cache_dir,
        dest_dir,
        git_program: raw
            .git_program
            .unwrap_or_else(|| DEFAULT_GIT_PROGRAM.to_string()),
    })
}

/// Absolute form of `path` with `.` and `..` folded away, without touching
/// the filesystem. Symlinks are not resolved.
fn lexical_absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve {:?} against the current directory", path))?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
