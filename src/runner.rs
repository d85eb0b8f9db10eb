//! The incremental enrichment loop.
//!
//! Rows are visited strictly in order. Each row either skips (no name, or
//! already complete) or gets exactly one lookup whose result is merged under
//! the configured overwrite policy. Lookup failures leave the row untouched
//! for a future run, so rerunning the same command is the recovery path.
use crate::checkpoint::Checkpointer;
use crate::config::RowRange;
use crate::lookup::{LookupClient, LookupFailure, LookupResult};
use crate::lookup_log::{LookupLog, LookupLogEntry, LookupOutcome, LOOKUP_LOG_SCHEMA_VERSION};
use crate::policy::{classify, merge_updates, OverwritePolicy, Resolution};
use crate::record::{UrlField, NOT_FOUND};
use crate::store::RecordStore;
use crate::util::now_epoch_ms;
use anyhow::{Context, Result};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

/// Terminal state of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    SkippedNoName,
    SkippedComplete,
    LookupSucceeded,
    LookupFailed,
}

impl RowOutcome {
    fn skipped(self) -> bool {
        matches!(self, Self::SkippedNoName | Self::SkippedComplete)
    }
}

/// Loop parameters resolved from the run config.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub rows: RowRange,
    pub overwrite: OverwritePolicy,
    /// Pause after every looked-up row to stay under rate limits.
    pub delay: Duration,
}

/// Counts reported in the completion banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub rows_in_range: usize,
    pub skipped_no_name: usize,
    pub skipped_complete: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub checkpoints: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::SkippedNoName => self.skipped_no_name += 1,
            RowOutcome::SkippedComplete => self.skipped_complete += 1,
            RowOutcome::LookupSucceeded => self.succeeded += 1,
            RowOutcome::LookupFailed => self.failed += 1,
        }
    }

    pub fn lookups(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct EnrichmentRunner<'a, C: LookupClient + ?Sized> {
    client: &'a C,
    settings: &'a RunSettings,
    log: Option<&'a LookupLog>,
}

impl<'a, C: LookupClient + ?Sized> EnrichmentRunner<'a, C> {
    pub fn new(client: &'a C, settings: &'a RunSettings) -> Self {
        Self {
            client,
            settings,
            log: None,
        }
    }

    pub fn with_log(mut self, log: &'a LookupLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Enrich every row in range, checkpointing as configured.
    ///
    /// Only the final save can fail the run; periodic save errors are logged
    /// and the loop keeps going.
    pub fn run(&self, store: &mut RecordStore, checkpointer: &mut Checkpointer) -> Result<RunSummary> {
        store.ensure_columns(&UrlField::columns());

        let total = store.row_count();
        let range = self.settings.rows.clamp(total);
        let mut summary = RunSummary {
            total_rows: total,
            rows_in_range: range.len(),
            ..RunSummary::default()
        };
        println!(
            "Processing rows {}..{} of {} (overwrite: {})",
            range.start, range.end, total, self.settings.overwrite
        );

        for index in range {
            let outcome = self.process_row(store, index, total);
            summary.record(outcome);
            if outcome.skipped() {
                continue;
            }

            if let Err(err) = checkpointer.maybe_save(store, index) {
                tracing::warn!(row = index, error = %err, "checkpoint failed; continuing");
                eprintln!("  warning: checkpoint failed: {err}");
            }
            if !self.settings.delay.is_zero() {
                thread::sleep(self.settings.delay);
            }
        }

        checkpointer
            .final_save(store)
            .with_context(|| format!("final save to {}", checkpointer.path().display()))?;
        summary.checkpoints = checkpointer.saves();
        Ok(summary)
    }

    fn process_row(&self, store: &mut RecordStore, index: usize, total: usize) -> RowOutcome {
        let record = store.record(index);
        let Some(name) = record.usable_name() else {
            return RowOutcome::SkippedNoName;
        };

        let resolution = classify(&record);
        if resolution == Resolution::Complete {
            println!("[{}] Skipping {name} (fully resolved)", index + 1);
            return RowOutcome::SkippedComplete;
        }
        let mode = if resolution == Resolution::Partial {
            " (filling gaps)"
        } else {
            ""
        };
        println!("[{}/{total}] Searching: {name}...{mode}", index + 1);

        let start = Instant::now();
        let result = self.client.lookup(name, &record.description);
        self.log_lookup(index, name, start.elapsed(), &result);

        match result {
            Ok(found) => {
                for (field, value) in merge_updates(&record, &found, self.settings.overwrite) {
                    tracing::debug!(row = index, %field, %value, "field updated");
                    store.set_field(index, field.column(), &value);
                }
                println!(
                    "  -> Found job listings: {}",
                    found.job_listings.as_deref().unwrap_or(NOT_FOUND)
                );
                RowOutcome::LookupSucceeded
            }
            Err(failure) => {
                tracing::warn!(row = index, company = name, error = %failure, "lookup failed");
                println!("  -> Failed to find data: {failure}");
                RowOutcome::LookupFailed
            }
        }
    }

    fn log_lookup(
        &self,
        row: usize,
        name: &str,
        elapsed: Duration,
        result: &Result<LookupResult, LookupFailure>,
    ) {
        let Some(log) = self.log else {
            return;
        };
        let (outcome, job_listings, error) = match result {
            Ok(found) => (LookupOutcome::Found, found.job_listings.clone(), None),
            Err(failure) => (LookupOutcome::Failed, None, Some(failure.to_string())),
        };
        let entry = LookupLogEntry {
            schema_version: LOOKUP_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            row,
            name: name.to_string(),
            outcome,
            duration_ms: elapsed.as_millis() as u64,
            job_listings,
            error,
        };
        if let Err(err) = log.append(&entry) {
            tracing::warn!(error = %err, "lookup log append failed");
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
