use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default cache location, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".docs-cache";

/// Default git executable.
pub const DEFAULT_GIT_PROGRAM: &str = "git";

/// Which upstream repository, and which directory inside it, to mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    pub repo_url: String,
    /// Path of the mirrored directory inside the repository, e.g. `docs`.
    pub subtree_path: String,
    /// Branch or tag to check out. The remote's default branch when absent.
    #[serde(default)]
    pub reference: Option<String>,
}

impl RemoteSource {
    /// `subtree_path` without leading or trailing slashes, as git's sparse
    /// patterns and the checked-out tree both spell it.
    pub fn subtree_dir(&self) -> &str {
        self.subtree_path.trim_matches('/')
    }

    /// Location of the mirrored subtree inside a checkout at `cache_dir`.
    pub fn checkout_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(self.subtree_dir())
    }
}

/// Everything one pipeline run needs. Paths are used as given; callers
/// resolve them against the project root beforehand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: RemoteSource,
    /// Throwaway checkout location, owned exclusively by the pipeline.
    pub cache_dir: PathBuf,
    /// Published content directory, replaced wholesale on every run.
    pub dest_dir: PathBuf,
    #[serde(default = "default_git_program")]
    pub git_program: String,
}

fn default_git_program() -> String {
    DEFAULT_GIT_PROGRAM.to_string()
}

impl SyncConfig {
    pub fn new(source: RemoteSource, cache_dir: PathBuf, dest_dir: PathBuf) -> Self {
        Self {
            source,
            cache_dir,
            dest_dir,
            git_program: default_git_program(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            repo_url = %self.source.repo_url,
            subtree = %self.source.subtree_path,
            reference = self.source.reference.as_deref().unwrap_or("<default>"),
            cache_dir = %self.cache_dir.display(),
            dest_dir = %self.dest_dir.display(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
