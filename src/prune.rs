use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Directories a walk must not descend into: anything under `keep`, and
/// any directory below the root whose name is in `skip_names`.
pub fn is_skipped(entry: &DirEntry, keep: &[PathBuf], skip_names: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    skip_names.iter().any(|s| s.as_str() == name)
        || keep.iter().any(|k| k.as_path() == entry.path())
}

/// Remove directories under `root` that are empty, deepest first.
///
/// The root itself, anything under `keep` and directories named in
/// `skip_names` (with their contents) are left alone. Directories
/// that cannot be removed (non-empty, permission denied) are skipped.
/// Returns the removed directories.
pub fn prune_empty_dirs(root: &Path, keep: &[PathBuf], skip_names: &[String]) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    // contents_first gives a bottom-up order, so a parent is visited after
    // its children have had the chance to disappear.
    let walker = WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| !is_skipped(e, keep, skip_names))
        .filter_map(|e| e.ok());

    for entry in walker {
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        match std::fs::remove_dir(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "pruned empty directory");
                removed.push(path.to_path_buf());
            }
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "directory kept");
            }
        }
    }

    removed
}

/// Directories `prune_empty_dirs` would remove, without removing them.
/// A directory qualifies when everything inside it qualifies too.
pub fn find_empty_dirs(root: &Path, keep: &[PathBuf], skip_names: &[String]) -> Vec<PathBuf> {
    let mut empty: HashSet<PathBuf> = HashSet::new();
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| !is_skipped(e, keep, skip_names))
        .filter_map(|e| e.ok());

    for entry in walker {
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let Ok(read_dir) = std::fs::read_dir(path) else {
            continue;
        };
        let all_empty = read_dir
            .filter_map(|e| e.ok())
            .all(|child| empty.contains(&child.path()));
        if all_empty {
            empty.insert(path.to_path_buf());
            found.push(path.to_path_buf());
        }
    }

    found
}
