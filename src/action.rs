use std::ffi::OsStr;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DisposalError, Result};

/// Upper bound on "name (n).ext" attempts before giving up.
const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// What happens to an eligible file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisposalAction {
    DeletePermanently,
    MoveToTrash(PathBuf),
    MoveToBackup(PathBuf),
}

/// Label recorded in the disposal log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Deleted,
    MovedToTrash,
    MovedToBackup,
    Restored,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Deleted => "deleted",
            ActionKind::MovedToTrash => "moved-to-trash",
            ActionKind::MovedToBackup => "moved-to-backup",
            ActionKind::Restored => "restored",
        };
        f.write_str(s)
    }
}

/// What to do when the destination already holds a file of the same name.
/// Existing files are never overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    #[default]
    Fail,
    Rename,
}

impl DisposalAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            DisposalAction::DeletePermanently => ActionKind::Deleted,
            DisposalAction::MoveToTrash(_) => ActionKind::MovedToTrash,
            DisposalAction::MoveToBackup(_) => ActionKind::MovedToBackup,
        }
    }

    /// Directory files are moved into, if any.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            DisposalAction::DeletePermanently => None,
            DisposalAction::MoveToTrash(dir) | DisposalAction::MoveToBackup(dir) => Some(dir),
        }
    }

    /// Dispose of one file. Returns where it ended up for move actions.
    pub fn apply(&self, path: &Path, policy: CollisionPolicy) -> Result<Option<PathBuf>> {
        match self {
            DisposalAction::DeletePermanently => {
                std::fs::remove_file(path).map_err(|e| DisposalError::deletion(path, e))?;
                Ok(None)
            }
            DisposalAction::MoveToTrash(dir) | DisposalAction::MoveToBackup(dir) => {
                move_into(path, dir, policy).map(Some)
            }
        }
    }
}

/// Pick the path `file_name` should take inside `dir`.
pub fn resolve_target(
    source: &Path,
    dir: &Path,
    file_name: &OsStr,
    policy: CollisionPolicy,
) -> Result<PathBuf> {
    let target = dir.join(file_name);
    if !target.exists() {
        return Ok(target);
    }
    match policy {
        CollisionPolicy::Fail => Err(DisposalError::deletion(
            source,
            format!("{} already exists", target.display()),
        )),
        CollisionPolicy::Rename => unique_target(source, dir, file_name),
    }
}

fn unique_target(source: &Path, dir: &Path, file_name: &OsStr) -> Result<PathBuf> {
    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .unwrap_or(file_name)
        .to_string_lossy()
        .into_owned();
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = dir.join(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(DisposalError::deletion(
        source,
        format!("no free name for {} in {}", stem, dir.display()),
    ))
}

/// Move `path` into `dir`, creating `dir` when absent.
pub fn move_into(path: &Path, dir: &Path, policy: CollisionPolicy) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| DisposalError::deletion(path, "path has no file name"))?;

    std::fs::create_dir_all(dir).map_err(|e| {
        DisposalError::deletion(path, format!("cannot create {}: {e}", dir.display()))
    })?;

    let target = resolve_target(path, dir, file_name, policy)?;
    move_file(path, &target)?;
    Ok(target)
}

/// Move without ever replacing an existing `to`.
///
/// A hard link claims the target atomically and fails if it is taken. When
/// linking is not possible (across filesystems, or on filesystems without
/// links) the file is copied into a freshly created target instead.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::hard_link(from, to) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(DisposalError::deletion(
                from,
                format!("{} already exists", to.display()),
            ));
        }
        Err(e) => {
            tracing::debug!(from = %from.display(), error = %e, "hard link failed, copying");
            copy_new(from, to).map_err(|e| DisposalError::deletion(from, e))?;
        }
    }

    if let Err(e) = std::fs::remove_file(from) {
        let _ = std::fs::remove_file(to);
        return Err(DisposalError::deletion(from, e));
    }
    Ok(())
}

/// Copy `from` into `to`, failing if `to` already exists.
pub fn copy_new(from: &Path, to: &Path) -> io::Result<u64> {
    let mut reader = File::open(from)?;
    let permissions = reader.metadata()?.permissions();
    let mut out = OpenOptions::new().write(true).create_new(true).open(to)?;
    let copied = io::copy(&mut reader, &mut out).and_then(|n| {
        out.set_permissions(permissions)?;
        Ok(n)
    });
    if copied.is_err() {
        let _ = std::fs::remove_file(to);
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_delete_permanently() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.tmp");
        fs::write(&file, b"x").unwrap();

        let moved = DisposalAction::DeletePermanently
            .apply(&file, CollisionPolicy::Fail)
            .unwrap();
        assert!(moved.is_none());
        assert!(!file.exists());
    }

    #[test]
    fn test_delete_missing_file_is_deletion_error() {
        let tmp = TempDir::new().unwrap();
        let err = DisposalAction::DeletePermanently
            .apply(&tmp.path().join("gone.tmp"), CollisionPolicy::Fail)
            .unwrap_err();
        assert!(matches!(err, DisposalError::Deletion { .. }));
    }

    #[test]
    fn test_move_creates_destination() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.tmp");
        fs::write(&file, b"hello").unwrap();
        let backup = tmp.path().join("nested/backup");

        let target = DisposalAction::MoveToBackup(backup.clone())
            .apply(&file, CollisionPolicy::Fail)
            .unwrap()
            .unwrap();

        assert_eq!(target, backup.join("a.tmp"));
        assert_eq!(fs::read(&target).unwrap(), b"hello");
        assert!(!file.exists());
    }

    #[test]
    fn test_collision_fail_keeps_both_files() {
        let tmp = TempDir::new().unwrap();
        let backup = tmp.path().join("backup");
        fs::create_dir(&backup).unwrap();
        fs::write(backup.join("a.tmp"), b"old").unwrap();
        let file = tmp.path().join("a.tmp");
        fs::write(&file, b"new").unwrap();

        let err = move_into(&file, &backup, CollisionPolicy::Fail).unwrap_err();
        assert!(matches!(err, DisposalError::Deletion { .. }));
        assert_eq!(fs::read(backup.join("a.tmp")).unwrap(), b"old");
        assert!(file.exists());
    }

    #[test]
    fn test_collision_rename_picks_free_name() {
        let tmp = TempDir::new().unwrap();
        let backup = tmp.path().join("backup");
        fs::create_dir(&backup).unwrap();
        fs::write(backup.join("report.log"), b"1").unwrap();
        fs::write(backup.join("report (1).log"), b"2").unwrap();
        let file = tmp.path().join("report.log");
        fs::write(&file, b"3").unwrap();

        let target = move_into(&file, &backup, CollisionPolicy::Rename).unwrap();
        assert_eq!(target, backup.join("report (2).log"));
        assert_eq!(fs::read(&target).unwrap(), b"3");
    }

    #[test]
    fn test_move_file_never_replaces_target() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.tmp");
        let to = tmp.path().join("taken.tmp");
        fs::write(&from, b"mine").unwrap();
        fs::write(&to, b"theirs").unwrap();

        let err = move_file(&from, &to).unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");
        assert_eq!(fs::read(&from).unwrap(), b"mine");
        assert_eq!(fs::read(&to).unwrap(), b"theirs");
    }

    #[test]
    fn test_copy_new_refuses_existing_target() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.tmp");
        let to = tmp.path().join("b.tmp");
        fs::write(&from, b"data").unwrap();

        assert_eq!(copy_new(&from, &to).unwrap(), 4);
        assert_eq!(fs::read(&to).unwrap(), b"data");

        fs::write(&from, b"changed").unwrap();
        let err = copy_new(&from, &to).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&to).unwrap(), b"data");
    }

    #[test]
    fn test_action_kind_labels() {
        assert_eq!(ActionKind::Deleted.to_string(), "deleted");
        assert_eq!(
            DisposalAction::MoveToTrash(PathBuf::from("/t")).kind().to_string(),
            "moved-to-trash"
        );
        assert_eq!(
            DisposalAction::MoveToBackup(PathBuf::from("/b")).kind(),
            ActionKind::MovedToBackup
        );
    }
}
