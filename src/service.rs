use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use rayon::prelude::*;

use crate::error::Result;
use crate::journal::Journal;
use crate::report::{self, ScanReport};
use crate::scan::{Classification, DirectoryDisposalScan, DisposalSummary, ScanEvent, ScanOptions};

/// Messages sent from the background worker to the front-end.
#[derive(Debug)]
pub enum WorkerMessage {
    Started(PathBuf),
    Event(ScanEvent),
    Finished(PathBuf, Result<DisposalSummary>),
    AllComplete,
}

/// Owns the disposal log and the history of completed scans.
#[derive(Debug)]
pub struct DisposalService {
    journal: Journal,
    history: Mutex<Vec<ScanReport>>,
    report_file: Option<PathBuf>,
}

impl DisposalService {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            history: Mutex::new(Vec::new()),
            report_file: None,
        }
    }

    /// Also append a row to `path` after every completed scan.
    pub fn with_report_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_file = Some(path.into());
        self
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Classification only.
    pub fn preview(&self, root: &Path, options: &ScanOptions) -> Result<Classification> {
        Ok(DirectoryDisposalScan::new(root, options, &self.journal)?.classify())
    }

    pub fn scan(&self, root: &Path, options: &ScanOptions) -> Result<DisposalSummary> {
        self.scan_with(root, options, &mut |_| {})
    }

    pub fn scan_with(
        &self,
        root: &Path,
        options: &ScanOptions,
        on_event: &mut dyn FnMut(&ScanEvent),
    ) -> Result<DisposalSummary> {
        let scan = DirectoryDisposalScan::new(root, options, &self.journal)?;
        let summary = scan.run_with(on_event);
        self.record(scan.root(), &summary);
        Ok(summary)
    }

    /// One rayon task per root. Each root gets its own summary.
    pub fn scan_many(
        &self,
        roots: &[PathBuf],
        options: &ScanOptions,
    ) -> Vec<(PathBuf, Result<DisposalSummary>)> {
        roots
            .par_iter()
            .map(|root| (root.clone(), self.scan(root, options)))
            .collect()
    }

    /// Run the scans on a dedicated thread and stream progress back.
    pub fn spawn(
        self: &Arc<Self>,
        roots: Vec<PathBuf>,
        options: Arc<ScanOptions>,
    ) -> (JoinHandle<()>, mpsc::Receiver<WorkerMessage>) {
        let (tx, rx) = mpsc::channel::<WorkerMessage>();
        let service = Arc::clone(self);

        let handle = std::thread::spawn(move || {
            for root in roots {
                let _ = tx.send(WorkerMessage::Started(root.clone()));
                let result = service.scan_with(&root, &options, &mut |event| {
                    let _ = tx.send(WorkerMessage::Event(event.clone()));
                });
                let _ = tx.send(WorkerMessage::Finished(root, result));
            }
            let _ = tx.send(WorkerMessage::AllComplete);
        });

        (handle, rx)
    }

    pub fn history(&self) -> Vec<ScanReport> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Write the in-memory history as CSV.
    pub fn export_report(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        report::write_csv(std::io::BufWriter::new(file), &self.history())
    }

    fn record(&self, root: &Path, summary: &DisposalSummary) {
        let row = ScanReport::from_summary(root, summary);
        if let Some(path) = &self.report_file {
            if let Err(e) = report::append_row(path, &row) {
                tracing::warn!(file = %path.display(), error = %e, "could not append report row");
            }
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DisposalAction;
    use crate::error::DisposalError;
    use crate::rule::DisposalRule;
    use std::fs;
    use tempfile::TempDir;

    fn options() -> ScanOptions {
        ScanOptions::new(
            DisposalRule::new([".tmp"], [".pdf"]),
            DisposalAction::DeletePermanently,
        )
    }

    fn populate(dir: &Path, files: &[(&str, usize)]) {
        fs::create_dir_all(dir).unwrap();
        for (name, size) in files {
            fs::write(dir.join(name), vec![0u8; *size]).unwrap();
        }
    }

    #[test]
    fn test_scan_records_history_and_report_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        populate(&root, &[("a.tmp", 10), ("b.tmp", 5), ("c.pdf", 7)]);
        let report_file = tmp.path().join("history.csv");

        let service = DisposalService::new(Journal::disabled()).with_report_file(&report_file);
        let summary = service.scan(&root, &options()).unwrap();

        assert_eq!(summary.disposed, 2);
        assert_eq!(summary.freed_bytes, 15);
        let history = service.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].files_disposed, 2);

        let rows = report::read_rows(&report_file).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].freed_bytes, 15);
    }

    #[test]
    fn test_invalid_root_is_not_recorded() {
        let tmp = TempDir::new().unwrap();
        let service = DisposalService::new(Journal::disabled());
        let err = service
            .scan(&tmp.path().join("missing"), &options())
            .unwrap_err();
        assert!(matches!(err, DisposalError::InvalidDirectory { .. }));
        assert!(service.history().is_empty());
    }

    #[test]
    fn test_scan_many_keeps_separate_summaries() {
        let tmp = TempDir::new().unwrap();
        let one = tmp.path().join("one");
        let two = tmp.path().join("two");
        populate(&one, &[("a.tmp", 1)]);
        populate(&two, &[("a.tmp", 2), ("b.tmp", 3)]);
        let log = tmp.path().join("disposal.log");

        let service = DisposalService::new(Journal::open(&log).unwrap());
        let results = service.scan_many(&[one.clone(), two.clone(), tmp.path().join("x")], &options());

        let by_root = |p: &Path| {
            results
                .iter()
                .find(|(r, _)| r == p)
                .map(|(_, s)| s.as_ref().ok().cloned())
                .unwrap()
        };
        assert_eq!(by_root(&one).unwrap().disposed, 1);
        assert_eq!(by_root(&two).unwrap().freed_bytes, 5);
        assert!(by_root(&tmp.path().join("x")).is_none());
        assert_eq!(service.history().len(), 2);
        assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_background_worker_streams_messages() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        populate(&root, &[("a.tmp", 4), ("b.tmp", 4)]);

        let service = Arc::new(DisposalService::new(Journal::disabled()));
        let (handle, rx) = service.spawn(vec![root.clone()], Arc::new(options()));
        let messages: Vec<WorkerMessage> = rx.iter().collect();
        handle.join().unwrap();

        assert!(matches!(messages.first(), Some(WorkerMessage::Started(_))));
        assert!(matches!(messages.last(), Some(WorkerMessage::AllComplete)));
        let disposed = messages
            .iter()
            .filter(|m| matches!(m, WorkerMessage::Event(ScanEvent::Disposed { .. })))
            .count();
        assert_eq!(disposed, 2);
        let finished = messages.iter().find_map(|m| match m {
            WorkerMessage::Finished(_, Ok(summary)) => Some(summary.freed_bytes),
            _ => None,
        });
        assert_eq!(finished, Some(8));
    }

    #[test]
    fn test_export_report() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        populate(&root, &[("a.tmp", 3)]);
        let service = DisposalService::new(Journal::disabled());
        service.scan(&root, &options()).unwrap();
        service.scan(&root, &options()).unwrap();

        let out = tmp.path().join("export.csv");
        service.export_report(&out).unwrap();
        let rows = report::read_rows(&out).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].files_disposed, 1);
        assert_eq!(rows[1].files_disposed, 0);
    }
}
