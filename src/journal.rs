//! Append-only disposal log.
//!
//! The log file is opened once, shared by every scan of the process, and
//! flushed after each line. It is never rotated or truncated.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};

use crate::action::ActionKind;
use crate::error::{DisposalError, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

/// One attempted disposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalRecord {
    pub timestamp: DateTime<Local>,
    pub path: PathBuf,
    pub action: ActionKind,
    pub outcome: Outcome,
}

impl DisposalRecord {
    pub fn success(path: &Path, action: ActionKind) -> Self {
        Self {
            timestamp: Local::now(),
            path: path.to_path_buf(),
            action,
            outcome: Outcome::Success,
        }
    }

    pub fn failure(path: &Path, action: ActionKind, reason: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            path: path.to_path_buf(),
            action,
            outcome: Outcome::Failure(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

impl fmt::Display for DisposalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.action,
            self.path.display()
        )?;
        match &self.outcome {
            Outcome::Success => f.write_str("ok"),
            Outcome::Failure(reason) => write!(f, "FAILED: {reason}"),
        }
    }
}

/// Shared, line-oriented log of disposal records.
#[derive(Debug)]
pub struct Journal {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl Journal {
    /// Open (or create) the log for appending, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DisposalError::LogWrite {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| DisposalError::LogWrite {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            file: Mutex::new(Some(file)),
        })
    }

    /// A journal that only emits tracing events.
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one line and flush it.
    pub fn append(&self, record: &DisposalRecord) -> Result<()> {
        match &record.outcome {
            Outcome::Success => {
                tracing::debug!(path = %record.path.display(), action = %record.action, "disposal recorded")
            }
            Outcome::Failure(reason) => {
                tracing::debug!(path = %record.path.display(), action = %record.action, %reason, "failure recorded")
            }
        }

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(file) = guard.as_mut() else {
            return Ok(());
        };
        writeln!(file, "{record}")
            .and_then(|()| file.flush())
            .map_err(|source| DisposalError::LogWrite {
                path: self.path.clone().unwrap_or_default(),
                source,
            })
    }
}
