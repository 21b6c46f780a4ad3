mod custom;
mod old_downloads;
mod temp_files;

use std::path::PathBuf;

use crate::cleaner::Cleaner;

/// Every preset. `paths`, when non-empty, replaces each preset's own roots.
pub fn all_cleaners(paths: &[PathBuf]) -> Vec<Box<dyn Cleaner>> {
    vec![
        Box::new(custom::Custom::new(paths)),
        Box::new(temp_files::TempFiles::new(paths)),
        Box::new(old_downloads::OldDownloads::new(paths)),
    ]
}

pub fn find_cleaner(name: &str, paths: &[PathBuf]) -> Option<Box<dyn Cleaner>> {
    all_cleaners(paths).into_iter().find(|c| c.name() == name)
}

pub fn all_cleaner_names() -> Vec<&'static str> {
    vec!["custom", "temp-files", "old-downloads"]
}
