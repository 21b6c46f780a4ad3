use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisposalError {
    /// The scan root is missing, not a directory, or unreadable.
    #[error("Invalid directory {}: {reason}", path.display())]
    InvalidDirectory { path: PathBuf, reason: String },

    /// A single file could not be moved or deleted.
    #[error("Failed to dispose of {}: {reason}", path.display())]
    Deletion { path: PathBuf, reason: String },

    /// Appending to the disposal log failed.
    #[error("Failed to write disposal log {}: {source}", path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DisposalError {
    pub fn invalid_directory(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::InvalidDirectory {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn deletion(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::Deletion {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DisposalError>;
