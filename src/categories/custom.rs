use std::path::PathBuf;

use crate::cleaner::{Cleaner, ScanPlan};
use crate::config::Settings;
use crate::error::{DisposalError, Result};

/// The `[rule]` table of the config file applied to `--path` roots.
pub struct Custom {
    roots: Vec<PathBuf>,
}

impl Custom {
    pub fn new(paths: &[PathBuf]) -> Self {
        Self {
            roots: paths.to_vec(),
        }
    }
}

impl Cleaner for Custom {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn label(&self) -> &'static str {
        "Junk Files"
    }

    fn plan(&self, settings: &Settings) -> Result<ScanPlan> {
        if self.roots.is_empty() {
            return Err(DisposalError::Config(
                "the custom preset needs at least one --path".into(),
            ));
        }
        Ok(ScanPlan {
            roots: self.roots.clone(),
            rule: settings.rule.to_rule()?,
            skip_dirs: settings.skip_dirs.clone(),
        })
    }
}
