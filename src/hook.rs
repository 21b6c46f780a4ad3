use std::ffi::OsString;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::action::{copy_new, resolve_target, CollisionPolicy};
use crate::error::{DisposalError, Result};

/// Work done on a file right before it is disposed of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookKind {
    /// Plain copy into the directory.
    CopyToBackup(PathBuf),
    /// Gzip into `<dir>/<name>.gz`.
    Compress(PathBuf),
}

pub type Decide = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// Whether the hook runs, decided once per scan instead of prompting
/// inside the file loop.
#[derive(Default)]
pub enum PreDisposal {
    #[default]
    Never,
    Always(HookKind),
    /// `decide` is consulted per file; `true` runs the hook.
    Ask { kind: HookKind, decide: Decide },
}

impl fmt::Debug for PreDisposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreDisposal::Never => f.write_str("Never"),
            PreDisposal::Always(kind) => f.debug_tuple("Always").field(kind).finish(),
            PreDisposal::Ask { kind, .. } => f.debug_struct("Ask").field("kind", kind).finish(),
        }
    }
}

impl PreDisposal {
    pub fn ask(kind: HookKind, decide: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        PreDisposal::Ask {
            kind,
            decide: Box::new(decide),
        }
    }

    pub fn kind(&self) -> Option<&HookKind> {
        match self {
            PreDisposal::Never => None,
            PreDisposal::Always(kind) | PreDisposal::Ask { kind, .. } => Some(kind),
        }
    }

    /// Run the hook for `path` if the decision says so. Returns the copy
    /// it produced.
    pub fn run(&self, path: &Path, policy: CollisionPolicy) -> Result<Option<PathBuf>> {
        let kind = match self {
            PreDisposal::Never => return Ok(None),
            PreDisposal::Always(kind) => kind,
            PreDisposal::Ask { kind, decide } => {
                if !decide(path) {
                    return Ok(None);
                }
                kind
            }
        };
        kind.run(path, policy).map(Some)
    }
}

impl HookKind {
    pub fn destination(&self) -> &Path {
        match self {
            HookKind::CopyToBackup(dir) | HookKind::Compress(dir) => dir,
        }
    }

    pub fn run(&self, path: &Path, policy: CollisionPolicy) -> Result<PathBuf> {
        let file_name = path
            .file_name()
            .ok_or_else(|| DisposalError::deletion(path, "path has no file name"))?;
        let dir = self.destination();
        std::fs::create_dir_all(dir).map_err(|e| {
            DisposalError::deletion(path, format!("cannot create {}: {e}", dir.display()))
        })?;

        match self {
            HookKind::CopyToBackup(_) => {
                let target = resolve_target(path, dir, file_name, policy)?;
                copy_new(path, &target).map_err(|e| {
                    DisposalError::deletion(path, format!("backup copy failed: {e}"))
                })?;
                tracing::debug!(from = %path.display(), to = %target.display(), "copied before disposal");
                Ok(target)
            }
            HookKind::Compress(_) => {
                let mut gz_name = OsString::from(file_name);
                gz_name.push(".gz");
                let target = resolve_target(path, dir, &gz_name, policy)?;
                if let Err(e) = gzip_file(path, &target) {
                    let _ = std::fs::remove_file(&target);
                    return Err(DisposalError::deletion(
                        path,
                        format!("compression failed: {e}"),
                    ));
                }
                tracing::debug!(from = %path.display(), to = %target.display(), "compressed before disposal");
                Ok(target)
            }
        }
    }
}

fn gzip_file(source: &Path, target: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(source)?);
    let out = OpenOptions::new().write(true).create_new(true).open(target)?;
    let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()
}
