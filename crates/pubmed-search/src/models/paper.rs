//! Paper data model and normalization from upstream records.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Placeholder for a record without a title.
pub const DEFAULT_TITLE: &str = "No title available";

/// Placeholder for a record without an abstract.
pub const DEFAULT_ABSTRACT: &str = "No abstract available";

/// Placeholder for a record without a journal.
pub const DEFAULT_JOURNAL: &str = "Unknown Journal";

/// A record as returned by EFetch, before any defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// PubMed identifier.
    pub pmid: Option<String>,

    /// Article title.
    pub title: Option<String>,

    /// Abstract, sections joined by newlines.
    pub abstract_text: Option<String>,

    /// Author names in upstream order.
    pub authors: Vec<String>,

    /// Journal title.
    pub journal: Option<String>,

    /// Publication date as printed upstream (e.g. "2023 Jan 15", "2021 Jan-Feb").
    pub pub_date: Option<String>,
}

/// A normalized search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// PubMed identifier.
    pub id: String,

    /// Article title.
    pub title: String,

    /// Article abstract.
    pub r#abstract: String,

    /// Author names in upstream order.
    pub authors: Vec<String>,

    /// Journal title.
    pub journal: String,

    /// Publication year, 0 when unknown.
    pub year: u32,

    /// Number of citing documents, 0 when unknown.
    pub citations: usize,
}

impl Paper {
    /// Normalize an upstream record, substituting defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingPmid`] if the record has no identifier.
    pub fn from_record(record: RawRecord) -> Result<Self, RecordError> {
        let id = non_empty(record.pmid).ok_or(RecordError::MissingPmid)?;
        let year = record.pub_date.as_deref().map_or(0, parse_year);

        Ok(Self {
            id,
            title: non_empty(record.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            r#abstract: non_empty(record.abstract_text)
                .unwrap_or_else(|| DEFAULT_ABSTRACT.to_string()),
            authors: record.authors.into_iter().filter(|a| !a.trim().is_empty()).collect(),
            journal: non_empty(record.journal).unwrap_or_else(|| DEFAULT_JOURNAL.to_string()),
            year,
            citations: 0,
        })
    }
}

/// Derive a year from an upstream date string.
///
/// Takes the first whitespace-separated token and parses its leading four
/// characters; anything unparseable yields 0.
#[must_use]
pub fn parse_year(date: &str) -> u32 {
    date.split_whitespace()
        .next()
        .and_then(|token| token.get(..4))
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
