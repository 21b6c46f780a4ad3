//! Move old and junk files out of the way.
//!
//! [`scan::DirectoryDisposalScan`] walks a directory, classifies every file
//! against a [`rule::DisposalRule`] and disposes of the eligible ones with a
//! [`action::DisposalAction`]. [`service::DisposalService`] owns the
//! disposal log and scan history and can run scans on a background thread
//! or over several roots in parallel.

pub mod action;
pub mod categories;
pub mod cleaner;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod hook;
pub mod journal;
pub mod output;
pub mod prune;
pub mod report;
pub mod restore;
pub mod rule;
pub mod scan;
pub mod schedule;
pub mod service;
pub mod utils;

pub use action::{ActionKind, CollisionPolicy, DisposalAction};
pub use error::{DisposalError, Result};
pub use hook::{HookKind, PreDisposal};
pub use journal::{DisposalRecord, Journal};
pub use rule::{DisposalCandidate, DisposalRule};
pub use scan::{DirectoryDisposalScan, DisposalSummary, ScanEvent, ScanOptions};
pub use service::{DisposalService, WorkerMessage};
