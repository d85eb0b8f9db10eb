//! Column names and the typed row view used by the enrichment loop.
//!
//! The table itself stays stringly-typed (see `store`); this module pins the
//! well-known column headers so the loop and the status report agree on them.

/// Required identifier column.
pub const NAME_COLUMN: &str = "Company Name";
/// Optional free-text context passed to the lookup.
pub const DESCRIPTION_COLUMN: &str = "Company Description";

/// Sentinel written when a lookup ran but found nothing for a field.
pub const NOT_FOUND: &str = "Not Found";

/// The four URL fields filled in by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UrlField {
    Website,
    Linkedin,
    CareersPage,
    JobListings,
}

impl UrlField {
    /// Every URL field, in output column order.
    pub const ALL: [UrlField; 4] = [
        UrlField::Website,
        UrlField::Linkedin,
        UrlField::CareersPage,
        UrlField::JobListings,
    ];

    /// Header of the column backing this field.
    pub fn column(self) -> &'static str {
        match self {
            UrlField::Website => "Website URL",
            UrlField::Linkedin => "Linkedin URL",
            UrlField::CareersPage => "Careers Page URL",
            UrlField::JobListings => "Job Listings URL",
        }
    }

    /// Headers of every URL column, used with `RecordStore::ensure_columns`.
    pub fn columns() -> [&'static str; 4] {
        UrlField::ALL.map(UrlField::column)
    }
}

impl std::fmt::Display for UrlField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Website => write!(f, "website"),
            Self::Linkedin => write!(f, "linkedin"),
            Self::CareersPage => write!(f, "careers"),
            Self::JobListings => write!(f, "job_listings"),
        }
    }
}

/// Snapshot of one company row.
///
/// `None` means the cell is empty (never looked up, or the column was absent).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub name: Option<String>,
    pub description: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub careers_page: Option<String>,
    pub job_listings: Option<String>,
}

impl Record {
    /// Current value of a URL field.
    pub fn url(&self, field: UrlField) -> Option<&str> {
        match field {
            UrlField::Website => self.website.as_deref(),
            UrlField::Linkedin => self.linkedin.as_deref(),
            UrlField::CareersPage => self.careers_page.as_deref(),
            UrlField::JobListings => self.job_listings.as_deref(),
        }
    }

    /// Trimmed company name, or `None` for blank and spreadsheet-`nan` cells.
    pub fn usable_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|name| !is_blank_cell(name))
    }
}

/// True for empty cells and the `nan` text spreadsheets export for missing values.
pub fn is_blank_cell(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("nan")
}
