use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::action::{self, ActionKind, CollisionPolicy};
use crate::error::{DisposalError, Result};
use crate::journal::{DisposalRecord, Journal};

/// A file sitting in the backup folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Regular files directly inside `backup_dir`, sorted by name.
/// A folder that does not exist yet has no entries.
pub fn list_backups(backup_dir: &Path) -> Result<Vec<BackupEntry>> {
    let read_dir = match std::fs::read_dir(backup_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DisposalError::invalid_directory(backup_dir, e)),
    };

    let mut entries: Vec<BackupEntry> = read_dir
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some(BackupEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                size_bytes: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            })
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Move each named file out of `backup_dir` into `destination`.
///
/// Existing files in `destination` are never overwritten. Every attempt is
/// journaled as `restored`.
pub fn restore_files(
    backup_dir: &Path,
    names: &[String],
    destination: &Path,
    journal: &Journal,
) -> Vec<(String, Result<PathBuf>)> {
    names
        .iter()
        .map(|name| {
            let result = restore_one(backup_dir, name, destination);
            let source = backup_dir.join(name);
            let record = match &result {
                Ok(_) => DisposalRecord::success(&source, ActionKind::Restored),
                Err(e) => DisposalRecord::failure(&source, ActionKind::Restored, e.to_string()),
            };
            if let Err(e) = journal.append(&record) {
                tracing::warn!(error = %e, "disposal log write failed");
            }
            (name.clone(), result)
        })
        .collect()
}

fn restore_one(backup_dir: &Path, name: &str, destination: &Path) -> Result<PathBuf> {
    // Names must not escape the backup folder.
    let plain = Path::new(name).file_name().is_some_and(|n| n == name);
    if !plain {
        return Err(DisposalError::deletion(
            &backup_dir.join(name),
            "not a plain file name",
        ));
    }

    let source = backup_dir.join(name);
    if !source.is_file() {
        return Err(DisposalError::deletion(&source, "not found in backup folder"));
    }
    action::move_into(&source, destination, CollisionPolicy::Fail)
}
