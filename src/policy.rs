//! Completion and merge rules for company rows.
//!
//! Everything here is a pure function of the current row and, for merges, the
//! lookup result; the driver loop applies the returned updates.
use crate::lookup::LookupResult;
use crate::record::{Record, UrlField, NOT_FOUND};
use serde::{Deserialize, Serialize};

/// How much of a row is already filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Website and job listings are both usable; never looked up again.
    Complete,
    /// Some URL is usable, so a lookup must not clobber it.
    Partial,
    /// No usable URL at all.
    Unresolved,
}

/// Which fields a successful lookup is allowed to replace.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Fill website/LinkedIn only when the website is missing; always refresh
    /// careers and job listings.
    #[default]
    Backfill,
    /// Like `backfill`, but a usable careers/job-listings URL is never
    /// replaced by a miss.
    KeepFound,
    /// Refresh every field except a usable website.
    Replace,
}

impl std::fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backfill => write!(f, "backfill"),
            Self::KeepFound => write!(f, "keep-found"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

/// True iff the value is present and starts with `http`, as stored.
///
/// Leading whitespace disqualifies the cell so a stray-padded value gets
/// looked up again rather than trusted.
pub fn has_usable_url(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.starts_with("http"))
}

/// Job-listing discovery is the gate: LinkedIn and careers page do not count.
pub fn is_fully_resolved(record: &Record) -> bool {
    has_usable_url(record.website.as_deref()) && has_usable_url(record.job_listings.as_deref())
}

pub fn needs_website_backfill(record: &Record) -> bool {
    !has_usable_url(record.website.as_deref())
}

pub fn classify(record: &Record) -> Resolution {
    if is_fully_resolved(record) {
        return Resolution::Complete;
    }
    if UrlField::ALL
        .iter()
        .any(|field| has_usable_url(record.url(*field)))
    {
        Resolution::Partial
    } else {
        Resolution::Unresolved
    }
}

/// Field writes produced by merging `result` into `record`.
///
/// Keys missing from the result are written as the `Not Found` sentinel. A
/// usable website is never part of the returned updates.
pub fn merge_updates(
    record: &Record,
    result: &LookupResult,
    policy: OverwritePolicy,
) -> Vec<(UrlField, String)> {
    let incoming = |field: UrlField| result.get(field).unwrap_or(NOT_FOUND).to_string();
    let backfill = needs_website_backfill(record);
    let mut updates = Vec::new();

    if backfill {
        updates.push((UrlField::Website, incoming(UrlField::Website)));
    }

    match policy {
        OverwritePolicy::Replace => {
            updates.push((UrlField::Linkedin, incoming(UrlField::Linkedin)));
        }
        OverwritePolicy::Backfill | OverwritePolicy::KeepFound => {
            if backfill && !has_usable_url(record.linkedin.as_deref()) {
                updates.push((UrlField::Linkedin, incoming(UrlField::Linkedin)));
            }
        }
    }

    for field in [UrlField::CareersPage, UrlField::JobListings] {
        let value = incoming(field);
        let keep_existing = policy == OverwritePolicy::KeepFound
            && has_usable_url(record.url(field))
            && !has_usable_url(Some(value.as_str()));
        if !keep_existing {
            updates.push((field, value));
        }
    }

    updates
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
