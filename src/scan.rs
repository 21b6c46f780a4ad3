use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::action::{ActionKind, CollisionPolicy, DisposalAction};
use crate::error::{DisposalError, Result};
use crate::hook::{HookKind, PreDisposal};
use crate::journal::{DisposalRecord, Journal};
use crate::prune;
use crate::rule::{DisposalCandidate, DisposalRule};

/// Everything that shapes one scan besides the root.
#[derive(Debug)]
pub struct ScanOptions {
    pub rule: DisposalRule,
    pub action: DisposalAction,
    pub pre_disposal: PreDisposal,
    pub collision: CollisionPolicy,
    /// Run the empty-directory pass after disposal.
    pub prune_empty_dirs: bool,
    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,
}

impl ScanOptions {
    pub fn new(rule: DisposalRule, action: DisposalAction) -> Self {
        Self {
            rule,
            action,
            pre_disposal: PreDisposal::Never,
            collision: CollisionPolicy::Fail,
            prune_empty_dirs: false,
            skip_dirs: Vec::new(),
        }
    }

    pub fn with_pre_disposal(mut self, pre_disposal: PreDisposal) -> Self {
        self.pre_disposal = pre_disposal;
        self
    }

    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune_empty_dirs = prune;
        self
    }

    pub fn with_skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// A plain copy into the folder files are moved into would take the
    /// very name the move needs, so that pairing is refused.
    pub fn validate(&self) -> Result<()> {
        if let (Some(HookKind::CopyToBackup(copy_dir)), Some(dest)) =
            (self.pre_disposal.kind(), self.action.destination())
        {
            if normalize(copy_dir) == normalize(dest) {
                return Err(DisposalError::Config(format!(
                    "{} is both the pre-disposal copy folder and the move destination",
                    dest.display()
                )));
            }
        }
        Ok(())
    }

    /// Directories the scan writes into.
    fn destinations(&self) -> Vec<&Path> {
        self.action
            .destination()
            .into_iter()
            .chain(self.pre_disposal.kind().map(|k| k.destination()))
            .collect()
    }
}

/// Progress reported while a scan runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Disposed {
        path: PathBuf,
        size_bytes: u64,
        action: ActionKind,
        destination: Option<PathBuf>,
    },
    Failed {
        path: PathBuf,
        reason: String,
    },
    Pruned(PathBuf),
}

/// Result of one scan.
///
/// `freed_bytes` adds up the size of every file the scan tried to dispose
/// of, measured before disposal, failures included. `confirmed_bytes` only
/// counts files that were actually disposed of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisposalSummary {
    pub disposed: usize,
    pub failed: usize,
    pub freed_bytes: u64,
    pub confirmed_bytes: u64,
    pub pruned_dirs: usize,
    pub log_warnings: usize,
    pub errors: Vec<String>,
}

impl DisposalSummary {
    pub fn merge(&mut self, other: &DisposalSummary) {
        self.disposed += other.disposed;
        self.failed += other.failed;
        self.freed_bytes += other.freed_bytes;
        self.confirmed_bytes += other.confirmed_bytes;
        self.pruned_dirs += other.pruned_dirs;
        self.log_warnings += other.log_warnings;
        self.errors.extend(other.errors.iter().cloned());
    }
}

/// Candidates found by the classification pass, plus anything that could
/// not be inspected.
#[derive(Debug, Default)]
pub struct Classification {
    pub candidates: Vec<DisposalCandidate>,
    pub errors: Vec<String>,
}

/// One traversal of a root directory.
#[derive(Debug)]
pub struct DirectoryDisposalScan<'a> {
    root: PathBuf,
    options: &'a ScanOptions,
    journal: &'a Journal,
    now: SystemTime,
    skip_paths: Vec<PathBuf>,
}

impl<'a> DirectoryDisposalScan<'a> {
    /// Fails with `InvalidDirectory` before touching anything when the
    /// root is missing, not a directory, unreadable, or is itself the
    /// disposal destination. Conflicting options fail with `Config`.
    pub fn new(root: &Path, options: &'a ScanOptions, journal: &'a Journal) -> Result<Self> {
        options.validate()?;
        let meta = std::fs::metadata(root).map_err(|e| DisposalError::invalid_directory(root, e))?;
        if !meta.is_dir() {
            return Err(DisposalError::invalid_directory(root, "not a directory"));
        }
        std::fs::read_dir(root).map_err(|e| DisposalError::invalid_directory(root, e))?;
        let root = std::fs::canonicalize(root).map_err(|e| DisposalError::invalid_directory(root, e))?;

        let skip_paths: Vec<PathBuf> = options
            .destinations()
            .into_iter()
            .map(normalize)
            .collect();
        if skip_paths.iter().any(|p| *p == root) {
            return Err(DisposalError::invalid_directory(
                &root,
                "root is the disposal destination",
            ));
        }

        Ok(Self {
            root,
            options,
            journal,
            now: SystemTime::now(),
            skip_paths,
        })
    }

    /// Evaluate ages against `now` instead of the wall clock.
    pub fn at(mut self, now: SystemTime) -> Self {
        self.now = now;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Classification pass only. Nothing is moved or deleted.
    pub fn classify(&self) -> Classification {
        let mut out = Classification::default();
        let rule = &self.options.rule;

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !prune::is_skipped(e, &self.skip_paths, &self.options.skip_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    out.errors.push(e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "cannot stat file");
                    out.errors
                        .push(format!("Cannot read {}: {e}", entry.path().display()));
                    continue;
                }
            };

            let candidate = DisposalCandidate::from_metadata(entry.path(), &meta);
            if rule.is_eligible(&candidate, self.now) {
                tracing::debug!(path = %candidate.path.display(), size = candidate.size_bytes, "eligible");
                out.candidates.push(candidate);
            }
        }

        out
    }

    pub fn candidates(&self) -> Vec<DisposalCandidate> {
        self.classify().candidates
    }

    pub fn run(&self) -> DisposalSummary {
        self.run_with(&mut |_| {})
    }

    /// Classify, dispose of every candidate, then prune if enabled.
    pub fn run_with(&self, on_event: &mut dyn FnMut(&ScanEvent)) -> DisposalSummary {
        let Classification { candidates, errors } = self.classify();
        let mut summary = DisposalSummary {
            errors,
            ..Default::default()
        };
        let kind = self.options.action.kind();

        tracing::info!(
            root = %self.root.display(),
            candidates = candidates.len(),
            action = %kind,
            "disposing"
        );

        for candidate in &candidates {
            let path = candidate.path.as_path();
            summary.freed_bytes += candidate.size_bytes;

            let outcome = self
                .options
                .pre_disposal
                .run(path, self.options.collision)
                .and_then(|copy| {
                    self.options
                        .action
                        .apply(path, self.options.collision)
                        .map_err(|e| {
                            // the file stays put, so its copy would be an orphan
                            if let Some(copy) = copy {
                                let _ = std::fs::remove_file(copy);
                            }
                            e
                        })
                });

            let record = match outcome {
                Ok(destination) => {
                    summary.disposed += 1;
                    summary.confirmed_bytes += candidate.size_bytes;
                    on_event(&ScanEvent::Disposed {
                        path: candidate.path.clone(),
                        size_bytes: candidate.size_bytes,
                        action: kind,
                        destination,
                    });
                    DisposalRecord::success(path, kind)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "disposal failed");
                    let reason = failure_reason(&e);
                    summary.failed += 1;
                    summary.errors.push(e.to_string());
                    on_event(&ScanEvent::Failed {
                        path: candidate.path.clone(),
                        reason: reason.clone(),
                    });
                    DisposalRecord::failure(path, kind, reason)
                }
            };

            if let Err(e) = self.journal.append(&record) {
                tracing::warn!(error = %e, "disposal log write failed");
                summary.log_warnings += 1;
            }
        }

        if self.options.prune_empty_dirs {
            let pruned =
                prune::prune_empty_dirs(&self.root, &self.skip_paths, &self.options.skip_dirs);
            for dir in pruned {
                summary.pruned_dirs += 1;
                on_event(&ScanEvent::Pruned(dir));
            }
        }

        tracing::info!(
            root = %self.root.display(),
            disposed = summary.disposed,
            failed = summary.failed,
            freed = summary.freed_bytes,
            "scan complete"
        );
        summary
    }
}

fn failure_reason(err: &DisposalError) -> String {
    match err {
        DisposalError::Deletion { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Canonical form of a path that may not exist yet.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(p) = std::fs::canonicalize(path) {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            normalize(parent).join(name)
        }
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::HookKind;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(86_400);

    fn write_aged(path: &Path, size: usize, age_days: u64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'x'; size]).unwrap();
        let mtime = SystemTime::now() - DAY * age_days as u32;
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(mtime)).unwrap();
    }

    fn junk_rule() -> DisposalRule {
        DisposalRule::new([".tmp", ".log"], [".pdf"]).with_min_age(DAY * 30)
    }

    #[test]
    fn test_scenario_only_old_junk_is_disposed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        write_aged(&root.join("a.tmp"), 200, 40);
        write_aged(&root.join("b.pdf"), 500, 40);
        write_aged(&root.join("c.log"), 50, 1);

        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently);
        let journal = Journal::disabled();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal)
            .unwrap()
            .run();

        assert_eq!(summary.disposed, 1);
        assert_eq!(summary.freed_bytes, 200);
        assert_eq!(summary.failed, 0);
        assert!(!root.join("a.tmp").exists());
        assert!(root.join("b.pdf").exists());
        assert!(root.join("c.log").exists());
    }

    #[test]
    fn test_missing_root_is_invalid_directory() {
        let tmp = TempDir::new().unwrap();
        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently);
        let journal = Journal::disabled();
        let err = DirectoryDisposalScan::new(&tmp.path().join("nope"), &options, &journal)
            .unwrap_err();
        assert!(matches!(err, DisposalError::InvalidDirectory { .. }));
    }

    #[test]
    fn test_file_root_is_invalid_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.tmp");
        fs::write(&file, b"x").unwrap();
        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently);
        let journal = Journal::disabled();
        assert!(matches!(
            DirectoryDisposalScan::new(&file, &options, &journal),
            Err(DisposalError::InvalidDirectory { .. })
        ));
    }

    #[test]
    fn test_root_equal_to_destination_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let options = ScanOptions::new(
            junk_rule(),
            DisposalAction::MoveToBackup(tmp.path().to_path_buf()),
        );
        let journal = Journal::disabled();
        assert!(DirectoryDisposalScan::new(tmp.path(), &options, &journal).is_err());
    }

    #[test]
    fn test_recursive_and_second_pass_disposes_nothing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        write_aged(&root.join("x/y/deep.tmp"), 10, 90);
        write_aged(&root.join("x/top.log"), 10, 90);
        write_aged(&root.join("keep.txt"), 10, 90);

        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently);
        let journal = Journal::disabled();

        let first = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();
        assert_eq!(first.disposed, 2);

        let second = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();
        assert_eq!(second, DisposalSummary::default());
        assert!(root.join("keep.txt").exists());
    }

    #[test]
    fn test_backup_inside_root_is_not_rescanned() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let backup = root.join("backup");
        write_aged(&root.join("a.tmp"), 10, 90);
        write_aged(&backup.join("old.tmp"), 10, 90);

        let options = ScanOptions::new(junk_rule(), DisposalAction::MoveToBackup(backup.clone()));
        let journal = Journal::disabled();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();

        assert_eq!(summary.disposed, 1);
        assert!(backup.join("a.tmp").exists());
        assert!(backup.join("old.tmp").exists());
    }

    #[test]
    fn test_failure_does_not_stop_scan() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let backup = tmp.path().join("backup");
        write_aged(&root.join("clash.tmp"), 10, 90);
        write_aged(&root.join("one.tmp"), 20, 90);
        write_aged(&root.join("two.log"), 30, 90);
        // an existing file of the same name makes this one disposal fail
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("clash.tmp"), b"already here").unwrap();

        let options = ScanOptions::new(junk_rule(), DisposalAction::MoveToBackup(backup.clone()));
        let log = tmp.path().join("disposal.log");
        let journal = Journal::open(&log).unwrap();
        let mut events = Vec::new();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal)
            .unwrap()
            .run_with(&mut |e| events.push(e.clone()));

        assert_eq!(summary.disposed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.freed_bytes, 60);
        assert_eq!(summary.confirmed_bytes, 50);
        assert_eq!(summary.errors.len(), 1);
        assert!(root.join("clash.tmp").exists());
        assert!(backup.join("one.tmp").exists());
        assert!(backup.join("two.log").exists());
        assert_eq!(fs::read(backup.join("clash.tmp")).unwrap(), b"already here");

        assert_eq!(events.len(), 3);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ScanEvent::Failed { .. }))
                .count(),
            1
        );

        let text = fs::read_to_string(&log).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().filter(|l| l.contains("FAILED")).count(), 1);
    }

    #[test]
    fn test_prune_after_disposal() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        write_aged(&root.join("emptied/only.tmp"), 10, 90);
        write_aged(&root.join("mixed/gone.tmp"), 10, 90);
        write_aged(&root.join("mixed/stay.txt"), 10, 90);

        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently).with_prune(true);
        let journal = Journal::disabled();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();

        assert_eq!(summary.disposed, 2);
        assert_eq!(summary.pruned_dirs, 1);
        assert!(!root.join("emptied").exists());
        assert!(root.join("mixed/stay.txt").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_failed_hook_keeps_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let archive = tmp.path().join("archive");
        write_aged(&root.join("a.log"), 10, 90);
        fs::create_dir_all(&archive).unwrap();
        fs::write(archive.join("a.log.gz"), b"taken").unwrap();

        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently)
            .with_pre_disposal(PreDisposal::Always(HookKind::Compress(archive)));
        let journal = Journal::disabled();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.disposed, 0);
        assert!(root.join("a.log").exists());
    }

    #[test]
    fn test_skip_dirs_and_injected_clock() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        write_aged(&root.join(".git/objects/x.tmp"), 10, 0);
        write_aged(&root.join("fresh.tmp"), 10, 0);

        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently)
            .with_skip_dirs([".git"]);
        let journal = Journal::disabled();
        let scan = DirectoryDisposalScan::new(&root, &options, &journal).unwrap();
        assert!(scan.candidates().is_empty());

        let later = SystemTime::now() + DAY * 31;
        let names: Vec<String> = scan
            .at(later)
            .candidates()
            .iter()
            .filter_map(|c| c.file_name())
            .collect();
        assert_eq!(names, vec!["fresh.tmp".to_string()]);
    }

    #[test]
    fn test_copy_hook_into_move_destination_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let backup = tmp.path().join("backup");
        write_aged(&root.join("a.tmp"), 10, 90);

        let options = ScanOptions::new(junk_rule(), DisposalAction::MoveToBackup(backup.clone()))
            .with_pre_disposal(PreDisposal::Always(HookKind::CopyToBackup(backup.clone())));
        let journal = Journal::disabled();
        let err = DirectoryDisposalScan::new(&root, &options, &journal).unwrap_err();

        assert!(matches!(err, DisposalError::Config(_)), "{err}");
        assert!(root.join("a.tmp").exists());
        assert!(!backup.exists());
    }

    #[test]
    fn test_compress_into_move_destination_is_allowed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let backup = tmp.path().join("backup");
        write_aged(&root.join("a.tmp"), 10, 90);

        let options = ScanOptions::new(junk_rule(), DisposalAction::MoveToBackup(backup.clone()))
            .with_pre_disposal(PreDisposal::Always(HookKind::Compress(backup.clone())));
        let journal = Journal::disabled();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();

        assert_eq!(summary.disposed, 1);
        assert!(backup.join("a.tmp").exists());
        assert!(backup.join("a.tmp.gz").exists());
    }

    #[test]
    fn test_failed_disposal_removes_hook_copy() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let backup = tmp.path().join("backup");
        let copies = tmp.path().join("copies");
        write_aged(&root.join("clash.tmp"), 10, 90);
        write_aged(&root.join("fine.tmp"), 10, 90);
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("clash.tmp"), b"already here").unwrap();

        let options = ScanOptions::new(junk_rule(), DisposalAction::MoveToBackup(backup.clone()))
            .with_pre_disposal(PreDisposal::Always(HookKind::CopyToBackup(copies.clone())));
        let journal = Journal::disabled();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();

        assert_eq!(summary.disposed, 1);
        assert_eq!(summary.failed, 1);
        assert!(root.join("clash.tmp").exists());
        assert!(!copies.join("clash.tmp").exists());
        assert!(copies.join("fine.tmp").exists());
        assert!(backup.join("fine.tmp").exists());

        // nothing left behind blocks the next attempt
        fs::remove_file(backup.join("clash.tmp")).unwrap();
        let retry = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();
        assert_eq!(retry.disposed, 1);
        assert_eq!(retry.failed, 0);
    }

    #[test]
    fn test_prune_leaves_skip_dirs_alone() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(root.join(".git/refs/tags")).unwrap();
        write_aged(&root.join("old/a.tmp"), 10, 90);

        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently)
            .with_skip_dirs([".git"])
            .with_prune(true);
        let journal = Journal::disabled();
        let summary = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();

        assert_eq!(summary.disposed, 1);
        assert_eq!(summary.pruned_dirs, 1);
        assert!(!root.join("old").exists());
        assert!(root.join(".git/refs/tags").is_dir());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_log_write_failures_only_warn() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        for i in 0..3 {
            write_aged(&root.join(format!("f{i}.tmp")), 10, 90);
        }

        // every write to /dev/full fails with ENOSPC
        let journal = Journal::open(Path::new("/dev/full")).unwrap();
        let options = ScanOptions::new(junk_rule(), DisposalAction::DeletePermanently);
        let summary = DirectoryDisposalScan::new(&root, &options, &journal).unwrap().run();

        assert_eq!(summary.disposed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.log_warnings, 3);
        assert!(fs::read_dir(&root).unwrap().next().is_none());
    }
}
