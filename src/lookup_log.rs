//! Lookup logging for enrichment transparency.
//!
//! Each lookup appends one newline-delimited JSON entry so a run can be
//! audited afterwards without re-querying the service:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1760870000000,"row":4,"name":"Acme Corp","outcome":"found","duration_ms":4200,"job_listings":"https://acme.com/jobs"}
//! {"schema_version":1,"ts":1760870006000,"row":5,"name":"Globex","outcome":"failed","duration_ms":900,"error":"lookup request failed: HTTP 429: ..."}
//! ```
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current schema version for lookup log entries.
pub const LOOKUP_LOG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    Found,
    Failed,
}

/// A single lookup log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupLogEntry {
    pub schema_version: u32,

    /// Unix timestamp in milliseconds when the entry was written.
    pub ts: u64,

    /// Zero-based row index in the table.
    pub row: usize,

    pub name: String,

    pub outcome: LookupOutcome,

    pub duration_ms: u64,

    /// Job listings URL as returned (missing key logged as absent).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub job_listings: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Append-only JSONL sink.
#[derive(Debug, Clone)]
pub struct LookupLog {
    path: PathBuf,
}

impl LookupLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &LookupLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("create lookup log dir")?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        let mut line = serde_json::to_string(entry).context("serialize lookup log entry")?;
        line.push('\n');
        file.write_all(line.as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

/// Read every entry back, skipping malformed lines.
#[cfg(test)]
pub fn read_entries(path: &Path) -> Result<Vec<LookupLogEntry>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
