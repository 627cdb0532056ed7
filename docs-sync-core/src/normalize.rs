//! Ordering-prefix normalization of a checked-out tree.
//!
//! Upstream docs use names like `10-getting-started/01-install.mdx` purely to
//! order navigation. Published paths drop the `<digits>-` prefix from every
//! segment: `getting-started/install.mdx`.
//!
//! Normalization is two-phase. [`plan_renames`] walks the tree once and
//! records every rename against the *original* paths, rejecting sibling
//! collisions before anything is touched. [`apply_plan`] then renames
//! deepest-first, so each rename runs while its parent still carries its
//! original name.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::error::{io_err, SyncError};

static ORDER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^[0-9]+-(.+)$").expect("valid ordering prefix regex"));

/// Strip one leading `<digits>-` prefix. Names without a prefix, or whose
/// remainder would be empty, come back unchanged.
pub fn normalize_name(name: &str) -> Cow<'_, str> {
    match ORDER_PREFIX.captures(name).and_then(|c| c.get(1)) {
        Some(rest) => Cow::Borrowed(rest.as_str()),
        None => Cow::Borrowed(name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One pending rename. `from` is relative to the tree root and uses original
/// names for every segment; `to` is the new final segment only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: String,
    pub kind: EntryKind,
}

impl Rename {
    fn depth(&self) -> usize {
        self.from.components().count()
    }

    /// Relative path of the entry after the whole plan is applied.
    pub fn normalized_path(&self) -> PathBuf {
        let mut out = PathBuf::new();
        if let Some(parent) = self.from.parent() {
            for segment in parent.iter() {
                out.push(normalize_name(&segment.to_string_lossy()).as_ref());
            }
        }
        out.push(&self.to);
        out
    }
}

/// Renames for a whole tree, in traversal (pre-)order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    pub renames: Vec<Rename>,
}

impl RenamePlan {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }
}

/// Walk `root` depth-first and compute every rename needed.
///
/// Fails with [`SyncError::NameCollision`] when two entries of one directory
/// would share a name after normalization.
pub fn plan_renames(root: &Path) -> Result<RenamePlan, SyncError> {
    let mut plan = RenamePlan::default();
    visit_dir(root, Path::new(""), &mut plan)?;
    debug!(root = %root.display(), renames = plan.len(), "Computed rename plan");
    Ok(plan)
}

fn visit_dir(dir: &Path, rel: &Path, plan: &mut RenamePlan) -> Result<(), SyncError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_err(dir, e))?;
    entries.sort_by_key(|e| e.file_name());

    // normalized name -> original name of whoever claimed it first
    let mut claimed: HashMap<String, String> = HashMap::new();

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let os_name = entry.file_name();
        let child_rel = rel.join(&os_name);

        match os_name.to_str() {
            Some(name) => {
                let normalized = normalize_name(name).into_owned();
                if let Some(first) = claimed.get(&normalized) {
                    error!(
                        directory = %dir.display(),
                        name = %normalized,
                        first = %first,
                        second = %name,
                        "Two entries normalize to the same name"
                    );
                    return Err(SyncError::NameCollision {
                        directory: dir.to_path_buf(),
                        name: normalized,
                        first: first.clone(),
                        second: name.to_string(),
                    });
                }
                claimed.insert(normalized.clone(), name.to_string());

                if normalized != name {
                    plan.renames.push(Rename {
                        from: child_rel.clone(),
                        to: normalized,
                        kind,
                    });
                }
            }
            None => {
                warn!(path = %path.display(), "Skipping non UTF-8 name");
            }
        }

        if kind == EntryKind::Directory {
            visit_dir(&path, &child_rel, plan)?;
        }
    }
    Ok(())
}

/// Apply `plan` to the tree at `root`, deepest entries first.
pub fn apply_plan(root: &Path, plan: &RenamePlan) -> Result<(), SyncError> {
    let mut ordered: Vec<&Rename> = plan.renames.iter().collect();
    // Stable sort keeps traversal order among entries of equal depth.
    ordered.sort_by_key(|r| std::cmp::Reverse(r.depth()));

    for rename in ordered {
        let from = root.join(&rename.from);
        let to = from.with_file_name(&rename.to);
        fs::rename(&from, &to).map_err(|e| {
            error!(error = ?e, from = %from.display(), to = %to.display(), "Rename failed");
            io_err(&from, e)
        })?;
        debug!(from = %from.display(), to = %to.display(), "Renamed");
    }
    Ok(())
}

/// Plan and apply in one go. Returns the applied plan.
pub fn normalize_tree(root: &Path) -> Result<RenamePlan, SyncError> {
    let plan = plan_renames(root)?;
    apply_plan(root, &plan)?;
    info!(root = %root.display(), renamed = plan.len(), "Normalized tree");
    Ok(plan)
}
