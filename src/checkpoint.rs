//! Periodic whole-table saves that bound lost work on interruption.
//!
//! Saves are plain rewrites of the output file. A crash mid-write can leave a
//! truncated file; rerunning from the input recovers it.
use crate::store::{RecordStore, StoreError};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Checkpointer {
    path: PathBuf,
    every: usize,
    saves: usize,
}

impl Checkpointer {
    /// `every` below 1 is treated as 1.
    pub fn new(path: PathBuf, every: usize) -> Self {
        Self {
            path,
            every: every.max(1),
            saves: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of saves written so far, final save included.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Save when `row_index` falls on the cadence. Returns whether it saved.
    pub fn maybe_save(&mut self, store: &RecordStore, row_index: usize) -> Result<bool, StoreError> {
        if row_index % self.every != 0 {
            return Ok(false);
        }
        self.save(store)?;
        Ok(true)
    }

    pub fn final_save(&mut self, store: &RecordStore) -> Result<(), StoreError> {
        self.save(store)
    }

    fn save(&mut self, store: &RecordStore) -> Result<(), StoreError> {
        store.save(&self.path)?;
        self.saves += 1;
        tracing::debug!(path = %self.path.display(), saves = self.saves, "checkpoint written");
        Ok(())
    }
}
