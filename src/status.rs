//! Read-only progress summary for a company table.
//!
//! Uses the same completion rules as the enrichment loop, so `complete`
//! counts exactly the rows a run would skip.
use crate::config::RowRange;
use crate::policy::{classify, Resolution};
use crate::store::RecordStore;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub total_rows: usize,
    pub rows_in_range: usize,
    pub complete: usize,
    pub partial: usize,
    pub unresolved: usize,
    /// Rows a run would skip for lack of a company name.
    pub missing_name: usize,
}

impl StatusReport {
    /// Rows a run over the same range would send to the lookup service.
    pub fn pending(&self) -> usize {
        self.partial + self.unresolved
    }
}

pub fn status_report(store: &RecordStore, rows: &RowRange) -> StatusReport {
    let total = store.row_count();
    let range = rows.clamp(total);
    let mut report = StatusReport {
        total_rows: total,
        rows_in_range: range.len(),
        ..StatusReport::default()
    };
    for index in range {
        let record = store.record(index);
        if record.usable_name().is_none() {
            report.missing_name += 1;
            continue;
        }
        match classify(&record) {
            Resolution::Complete => report.complete += 1,
            Resolution::Partial => report.partial += 1,
            Resolution::Unresolved => report.unresolved += 1,
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordStore {
        RecordStore::from_rows(
            &["Company Name", "Website URL", "Job Listings URL"],
            &[
                &["Acme", "https://acme.com", "https://jobs.lever.co/acme"],
                &["Globex", "https://globex.com", "Not Found"],
                &["Initech", "Not Found", "Not Found"],
                &["", "https://orphan.com", ""],
                &["Hooli", "", ""],
            ],
        )
    }

    #[test]
    fn counts_each_resolution() {
        let report = status_report(&sample(), &RowRange::default());
        assert_eq!(
            report,
            StatusReport {
                total_rows: 5,
                rows_in_range: 5,
                complete: 1,
                partial: 1,
                unresolved: 2,
                missing_name: 1,
            }
        );
        assert_eq!(report.pending(), 3);
    }

    #[test]
    fn respects_row_range() {
        let report = status_report(&sample(), &RowRange::new(1, Some(3)));
        assert_eq!(report.rows_in_range, 2);
        assert_eq!((report.complete, report.partial, report.unresolved), (0, 1, 1));
    }
}
