//! Replay of a dump file into a target store.
//!
//! The replayer reads the dump line by line. Comment and blank lines are
//! skipped; every other line is trimmed and appended to a statement buffer,
//! and a line ending in `;` flushes the buffer to the target. A failing
//! statement is recorded and replay moves on to the next one.
//!
//! Statements are split on line boundaries only. Dumps written by
//! [`DumpWriter`](crate::dump::DumpWriter) never break a line inside a
//! literal, so each INSERT ends on the only line of its statement that ends
//! in `;`.

mod compression;

pub use compression::Compression;

use crate::error::{Error, Result};
use crate::store::TargetStore;
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;

/// Statements between progress reports
pub const PROGRESS_INTERVAL: u64 = 100;

/// Characters of a failing statement kept for reporting
const EXCERPT_LEN: usize = 50;

/// A statement the target rejected
#[derive(Debug, Clone, Serialize)]
pub struct StatementFailure {
    /// Line on which the statement terminated
    pub line: u64,
    /// Leading characters of the statement
    pub statement: String,
    pub error: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RestoreStats {
    /// Statements sent to the target, successful or not
    pub executed: u64,
    pub failed: u64,
    pub failures: Vec<StatementFailure>,
    /// Bytes left in the buffer with no terminating `;`
    pub unterminated: usize,
}

impl RestoreStats {
    pub fn succeeded(&self) -> u64 {
        self.executed - self.failed
    }
}

/// Replays dumps into `target`
pub struct Restorer<'a, T: TargetStore + ?Sized> {
    target: &'a mut T,
    progress_fn: Option<Box<dyn Fn(u64) + 'a>>,
}

impl<'a, T: TargetStore + ?Sized> Restorer<'a, T> {
    pub fn new(target: &'a mut T) -> Self {
        Self {
            target,
            progress_fn: None,
        }
    }

    /// Called with the executed-statement count every [`PROGRESS_INTERVAL`] statements
    pub fn with_progress<F: Fn(u64) + 'a>(mut self, f: F) -> Self {
        self.progress_fn = Some(Box::new(f));
        self
    }

    /// Open `path`, decompressing by extension, and replay it
    pub fn restore_file(&mut self, path: &Path) -> Result<RestoreStats> {
        if !path.exists() {
            return Err(Error::DumpNotFound(path.to_path_buf()));
        }

        let compression = Compression::from_path(path);
        if compression != Compression::None {
            tracing::info!("Detected compression: {}", compression);
        }

        let reader = compression.open(path)?;
        self.replay(reader)
    }

    pub fn replay<R: BufRead>(&mut self, mut reader: R) -> Result<RestoreStats> {
        let mut stats = RestoreStats::default();
        let mut statement = String::new();
        let mut raw = Vec::new();
        let mut line_no: u64 = 0;

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            line_no += 1;

            let decoded = String::from_utf8_lossy(&raw);
            let line = decoded.trim();
            if line.is_empty() || line.starts_with("--") {
                continue;
            }

            if !statement.is_empty() {
                statement.push(' ');
            }
            statement.push_str(line);

            if line.ends_with(';') {
                self.execute(&statement, line_no, &mut stats);
                statement.clear();
            }
        }

        if !statement.is_empty() {
            tracing::warn!(
                "Dump ends with an unterminated statement ({} bytes), not executed",
                statement.len()
            );
            stats.unterminated = statement.len();
        }

        tracing::info!(
            "Restored {} statements ({} failed)",
            stats.executed,
            stats.failed
        );
        Ok(stats)
    }

    fn execute(&mut self, statement: &str, line: u64, stats: &mut RestoreStats) {
        if let Err(e) = self.target.execute(statement) {
            let excerpt: String = statement.chars().take(EXCERPT_LEN).collect();
            tracing::warn!("Failed to execute statement: {}...", excerpt);
            tracing::warn!("  Error: {}", e);
            stats.failed += 1;
            stats.failures.push(StatementFailure {
                line,
                statement: excerpt,
                error: e.message,
            });
        }

        stats.executed += 1;
        if stats.executed % PROGRESS_INTERVAL == 0 {
            tracing::info!("Processed {} statements...", stats.executed);
            if let Some(ref progress) = self.progress_fn {
                progress(stats.executed);
            }
        }
    }
}
