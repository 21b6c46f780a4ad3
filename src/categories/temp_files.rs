use std::path::PathBuf;
use std::time::Duration;

use crate::cleaner::{Cleaner, ScanPlan};
use crate::config::Settings;
use crate::error::Result;
use crate::rule::{DisposalRule, MATCH_ALL};
use crate::utils::SECS_PER_DAY;

/// Files younger than this may still be open by whoever created them.
const MIN_AGE_DAYS: u64 = 1;

pub struct TempFiles {
    roots: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new(paths: &[PathBuf]) -> Self {
        let roots = if paths.is_empty() {
            vec![std::env::temp_dir()]
        } else {
            paths.to_vec()
        };
        Self { roots }
    }
}

impl Cleaner for TempFiles {
    fn name(&self) -> &'static str {
        "temp-files"
    }

    fn label(&self) -> &'static str {
        "Temporary Files"
    }

    fn plan(&self, settings: &Settings) -> Result<ScanPlan> {
        let rule = DisposalRule::new([MATCH_ALL], settings.rule.excluded.clone())
            .with_min_age(Duration::from_secs(MIN_AGE_DAYS * SECS_PER_DAY));
        rule.validate()?;
        Ok(ScanPlan {
            roots: self.roots.clone(),
            rule,
            skip_dirs: settings.skip_dirs.clone(),
        })
    }
}
