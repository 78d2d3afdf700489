//! Append-only audit log of every decision and side effect for an asset.
//!
//! Each entry is one line:
//!
//! ```text
//! 2026-03-14T09:21:07.112+00:00	WARNING	N_1234.mkv	frame mismatch at 2 of 1500 frames
//! ```
//!
//! Lines are written with a single `write_all` on a file opened for append,
//! so concurrent pipeline processes writing to the same log never interleave
//! within a line.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    /// File name of the asset the entry is about.
    pub asset: String,
    pub message: String,
}

impl AuditEntry {
    /// Render as one log line, newline included. Tabs and newlines inside the
    /// message are flattened so an entry always occupies exactly one line.
    pub fn to_line(&self) -> String {
        let message: String = self
            .message
            .chars()
            .map(|c| if c == '\n' || c == '\t' || c == '\r' { ' ' } else { c })
            .collect();
        format!(
            "{}\t{}\t{}\t{}\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            self.severity,
            self.asset,
            message.trim_end()
        )
    }
}

/// Audit writer owned by one coordinator invocation.
///
/// Every entry is kept in memory and mirrored to `tracing`; when a sink path
/// is configured it is also appended there.
#[derive(Debug, Default)]
pub struct AuditLog {
    sink: Option<PathBuf>,
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    /// Log that appends to `path`, creating the file and its parent directory
    /// on first write.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            sink: Some(path.into()),
            entries: Vec::new(),
        }
    }

    /// Log that only keeps entries in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> Option<&Path> {
        self.sink.as_deref()
    }

    pub fn record(&mut self, severity: Severity, asset: &str, message: impl Into<String>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            severity,
            asset: asset.to_string(),
            message: message.into(),
        };

        match severity {
            Severity::Info => tracing::info!(asset = %entry.asset, "{}", entry.message),
            Severity::Warning => tracing::warn!(asset = %entry.asset, "{}", entry.message),
            Severity::Error => tracing::error!(asset = %entry.asset, "{}", entry.message),
            Severity::Critical => {
                tracing::error!(asset = %entry.asset, critical = true, "{}", entry.message)
            }
        }

        if let Some(ref sink) = self.sink {
            // A lost audit line must not abort the pipeline; it is reported
            // through tracing instead.
            if let Err(e) = append_line(sink, &entry.to_line()) {
                tracing::error!("Failed to append to audit log {:?}: {}", sink, e);
            }
        }

        self.entries.push(entry);
    }

    pub fn info(&mut self, asset: &str, message: impl Into<String>) {
        self.record(Severity::Info, asset, message);
    }

    pub fn warning(&mut self, asset: &str, message: impl Into<String>) {
        self.record(Severity::Warning, asset, message);
    }

    pub fn error(&mut self, asset: &str, message: impl Into<String>) {
        self.record(Severity::Error, asset, message);
    }

    pub fn critical(&mut self, asset: &str, message: impl Into<String>) {
        self.record(Severity::Critical, asset, message);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }

    /// True if any entry's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())
}
