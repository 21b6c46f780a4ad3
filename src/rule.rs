use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{DisposalError, Result};

/// Pattern that matches every file name.
pub const MATCH_ALL: &str = "*";

/// Decides which files are junk.
///
/// A file is eligible when its name ends with one of `junk`, does not end
/// with any of `excluded`, and both its age and size reach the thresholds.
/// Suffixes compare ASCII case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalRule {
    pub junk: Vec<String>,
    pub excluded: Vec<String>,
    pub min_age: Duration,
    pub min_size: u64,
}

impl Default for DisposalRule {
    fn default() -> Self {
        Self {
            junk: [".tmp", ".log", ".bak", ".old", ".dmp", "~"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded: Vec::new(),
            min_age: Duration::ZERO,
            min_size: 0,
        }
    }
}

impl DisposalRule {
    pub fn new<J, E>(junk: J, excluded: E) -> Self
    where
        J: IntoIterator,
        J::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            junk: junk.into_iter().map(Into::into).collect(),
            excluded: excluded.into_iter().map(Into::into).collect(),
            min_age: Duration::ZERO,
            min_size: 0,
        }
    }

    pub fn with_min_age(mut self, min_age: Duration) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Junk and excluded patterns must be non-empty and disjoint.
    pub fn validate(&self) -> Result<()> {
        if let Some(empty) = self
            .junk
            .iter()
            .chain(self.excluded.iter())
            .find(|p| p.trim().is_empty())
        {
            return Err(DisposalError::Config(format!(
                "empty pattern {empty:?} in rule"
            )));
        }
        for pattern in &self.junk {
            if self
                .excluded
                .iter()
                .any(|ex| ex.eq_ignore_ascii_case(pattern))
            {
                return Err(DisposalError::Config(format!(
                    "pattern '{pattern}' is both junk and excluded"
                )));
            }
        }
        Ok(())
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|p| suffix_matches(name, p))
    }

    pub fn is_junk(&self, name: &str) -> bool {
        self.junk.iter().any(|p| suffix_matches(name, p))
    }

    /// Name match only, no age or size check.
    pub fn matches_name(&self, name: &str) -> bool {
        !self.is_excluded(name) && self.is_junk(name)
    }

    pub fn is_eligible(&self, candidate: &DisposalCandidate, now: SystemTime) -> bool {
        let Some(name) = candidate.file_name() else {
            return false;
        };
        self.matches_name(&name)
            && candidate.age(now) >= self.min_age
            && candidate.size_bytes >= self.min_size
    }
}

fn suffix_matches(name: &str, pattern: &str) -> bool {
    if pattern == MATCH_ALL {
        return true;
    }
    let (name, pattern) = (name.as_bytes(), pattern.as_bytes());
    name.len() >= pattern.len()
        && name[name.len() - pattern.len()..].eq_ignore_ascii_case(pattern)
}

/// A regular file seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

impl DisposalCandidate {
    /// Size and modification time come from a single metadata call.
    pub fn from_metadata(path: &Path, meta: &std::fs::Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Zero when the modification time lies in the future.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or(Duration::ZERO)
    }
}
