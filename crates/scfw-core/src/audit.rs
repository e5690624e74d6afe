//! Append-only JSON-lines audit sink.
//!
//! Every evaluated operation produces exactly one `AuditEntry`. Entries are
//! flushed synchronously before a Block verdict takes effect. A write
//! failure is retried once; if it still fails the entry is dropped and
//! counted, never propagated to the caller.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::config::Severity;

/// One decision record, serialized as a single JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp_iso: String,
    pub correlation_id: String,
    pub operation_kind: String,
    pub target: String,
    pub caller_origin: String,
    pub verdict: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub lifecycle_context: bool,
    pub pid: u32,
}

/// Summary record appended once at teardown.
#[derive(Debug, Clone, Serialize)]
struct SummaryEntry {
    timestamp_iso: String,
    record_type: &'static str,
    totals: std::collections::HashMap<String, u64>,
    blocks_by_kind: std::collections::HashMap<String, u64>,
    audit_dropped: u64,
    risky: bool,
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Append-only sink, opened once at initialize and never removed from
/// `output_files`. Safe to share across threads.
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
    dropped: AtomicU64,
}

impl AuditLog {
    /// Open (creating if absent) the JSON-lines file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Write one entry, retrying the open-and-append once on failure.
    /// Never panics and never returns an error to the caller: failures are
    /// counted in `dropped_count` instead.
    pub fn record(&self, entry: &AuditEntry) {
        let Ok(line) = serde_json::to_string(entry) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if self.write_line(&line).is_ok() {
            return;
        }
        if self.reopen().is_ok() && self.write_line(&line).is_ok() {
            return;
        }
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.file.lock().unwrap();
        match guard.as_mut() {
            Some(f) => {
                writeln!(f, "{}", line)?;
                f.flush()
            }
            None => Err(std::io::Error::new(std::io::ErrorKind::NotFound, "audit log not open")),
        }
    }

    fn reopen(&self) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        *self.file.lock().unwrap() = Some(file);
        Ok(())
    }

    /// Append the teardown summary record and flush.
    pub fn write_summary(
        &self,
        totals: std::collections::HashMap<String, u64>,
        blocks_by_kind: std::collections::HashMap<String, u64>,
        risky: bool,
    ) {
        let summary = SummaryEntry {
            timestamp_iso: now_iso(),
            record_type: "summary",
            totals,
            blocks_by_kind,
            audit_dropped: self.dropped_count(),
            risky,
        };
        if let Ok(line) = serde_json::to_string(&summary) {
            let _ = self.write_line(&line);
        }
    }
}
