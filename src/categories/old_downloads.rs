use std::path::PathBuf;
use std::time::Duration;

use crate::cleaner::{Cleaner, ScanPlan};
use crate::config::Settings;
use crate::error::{DisposalError, Result};
use crate::rule::{DisposalRule, MATCH_ALL};
use crate::utils::{self, SECS_PER_DAY};

const MIN_AGE_DAYS: u64 = 100;

/// Directories to skip.
const SKIP_DIRS: &[&str] = &[".git", "node_modules", ".venv", "venv", "__pycache__"];

pub struct OldDownloads {
    roots: Vec<PathBuf>,
}

impl OldDownloads {
    pub fn new(paths: &[PathBuf]) -> Self {
        let roots = if paths.is_empty() {
            dirs::download_dir()
                .or_else(|| utils::home_dir().map(|h| h.join("Downloads")))
                .into_iter()
                .collect()
        } else {
            paths.to_vec()
        };
        Self { roots }
    }
}

impl Cleaner for OldDownloads {
    fn name(&self) -> &'static str {
        "old-downloads"
    }

    fn label(&self) -> &'static str {
        "Old Downloads"
    }

    fn plan(&self, settings: &Settings) -> Result<ScanPlan> {
        if self.roots.is_empty() {
            return Err(DisposalError::Config(
                "could not locate the downloads folder, pass --path".into(),
            ));
        }
        let rule = DisposalRule::new([MATCH_ALL], settings.rule.excluded.clone())
            .with_min_age(Duration::from_secs(MIN_AGE_DAYS * SECS_PER_DAY));
        rule.validate()?;

        let mut skip_dirs: Vec<String> = SKIP_DIRS.iter().map(|s| s.to_string()).collect();
        skip_dirs.extend(settings.skip_dirs.iter().cloned());

        Ok(ScanPlan {
            roots: self.roots.clone(),
            rule,
            skip_dirs,
        })
    }
}
