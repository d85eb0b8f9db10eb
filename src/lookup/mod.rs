//! Company link lookup against a web-search-grounded LM.
//!
//! A lookup is one synchronous request per company. Failures are returned as
//! values so the driver loop can leave the row for a later run; nothing in
//! this module retries.
//!
//! # Response Contract
//!
//! The service is asked for a JSON object with the keys `website`,
//! `linkedin`, `careers`, and `job_listings`, each a URL or `"Not Found"`.
//! Replies are free-form text, so the object is recovered with
//! [`parse_possibly_wrapped_json`], which tolerates markdown fences and
//! surrounding prose.
use crate::record::UrlField;
use thiserror::Error;

mod gemini;
mod prompt;
mod response;

pub use gemini::{GeminiClient, GeminiSettings, ModelInfo};
pub use prompt::build_lookup_prompt;
pub use response::{parse_possibly_wrapped_json, ParseFailure};

/// Best-effort URLs recovered from one lookup.
///
/// `None` means the service omitted the key (or gave a blank/non-string value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResult {
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub careers: Option<String>,
    pub job_listings: Option<String>,
}

impl LookupResult {
    pub fn get(&self, field: UrlField) -> Option<&str> {
        match field {
            UrlField::Website => self.website.as_deref(),
            UrlField::Linkedin => self.linkedin.as_deref(),
            UrlField::CareersPage => self.careers.as_deref(),
            UrlField::JobListings => self.job_listings.as_deref(),
        }
    }
}

/// Why a lookup produced no result. The row is left unmodified.
#[derive(Debug, Error)]
pub enum LookupFailure {
    /// Transport, HTTP status, auth, or quota error.
    #[error("lookup request failed: {0}")]
    Remote(String),

    #[error("lookup returned an empty response")]
    EmptyResponse,

    #[error("unparseable lookup response: {0}")]
    Unparseable(#[from] ParseFailure),
}

/// Source of company links. Implementations must not panic on bad replies.
pub trait LookupClient {
    fn lookup(&self, name: &str, description: &str) -> Result<LookupResult, LookupFailure>;
}
