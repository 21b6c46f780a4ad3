//! Scan history export.
//!
//! One CSV row per completed scan: `timestamp,files_disposed,freed_bytes`.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::scan::DisposalSummary;

pub const HEADER: &str = "timestamp,files_disposed,freed_bytes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub finished_at: DateTime<Local>,
    /// Not exported.
    pub root: Option<PathBuf>,
    pub files_disposed: usize,
    pub freed_bytes: u64,
}

impl ScanReport {
    pub fn from_summary(root: &Path, summary: &DisposalSummary) -> Self {
        Self {
            finished_at: Local::now(),
            root: Some(root.to_path_buf()),
            files_disposed: summary.disposed,
            freed_bytes: summary.freed_bytes,
        }
    }

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{}",
            self.finished_at.to_rfc3339(),
            self.files_disposed,
            self.freed_bytes
        )
    }

    pub fn parse_csv_row(line: &str) -> Option<Self> {
        let mut cols = line.trim().split(',');
        let finished_at = DateTime::parse_from_rfc3339(cols.next()?)
            .ok()?
            .with_timezone(&Local);
        let files_disposed = cols.next()?.trim().parse().ok()?;
        let freed_bytes = cols.next()?.trim().parse().ok()?;
        if cols.next().is_some() {
            return None;
        }
        Some(Self {
            finished_at,
            root: None,
            files_disposed,
            freed_bytes,
        })
    }
}

pub fn write_csv<W: Write>(mut out: W, reports: &[ScanReport]) -> Result<()> {
    writeln!(out, "{HEADER}")?;
    for report in reports {
        writeln!(out, "{}", report.to_csv_row())?;
    }
    out.flush()?;
    Ok(())
}

/// Add one row, writing the header first when the file is new or empty.
pub fn append_row(path: &Path, report: &ScanReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        writeln!(file, "{HEADER}")?;
    }
    writeln!(file, "{}", report.to_csv_row())?;
    file.flush()?;
    Ok(())
}

/// Read every row. A missing file yields no rows; malformed lines are
/// skipped with a warning.
pub fn read_rows(path: &Path) -> Result<Vec<ScanReport>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.trim() == HEADER {
            continue;
        }
        match ScanReport::parse_csv_row(&line) {
            Some(row) => rows.push(row),
            None => tracing::warn!(file = %path.display(), line = idx + 1, "malformed report row"),
        }
    }
    Ok(rows)
}
