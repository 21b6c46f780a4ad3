use std::path::PathBuf;

use crate::config::Settings;
use crate::error::Result;
use crate::rule::DisposalRule;

/// Where to scan and what counts as junk there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub roots: Vec<PathBuf>,
    pub rule: DisposalRule,
    pub skip_dirs: Vec<String>,
}

/// The trait every preset implements.
pub trait Cleaner: Send + Sync {
    /// Machine-readable name used in --preset flag (e.g. "temp-files").
    fn name(&self) -> &'static str;

    /// Human-readable label for display (e.g. "Temporary Files").
    fn label(&self) -> &'static str;

    /// Build the plan. Never touches the filesystem.
    fn plan(&self, settings: &Settings) -> Result<ScanPlan>;
}
