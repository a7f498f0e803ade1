//! Search request and response envelopes.

use serde::{Deserialize, Deserializer, Serialize};

use super::Paper;

/// Message attached to an empty result set.
pub const NO_RESULTS_MESSAGE: &str = "No results found";

/// Inclusive publication date bounds in PubMed format (`YYYY`, `YYYY/MM/DD`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Lower bound.
    #[serde(default)]
    pub start: Option<String>,

    /// Upper bound.
    #[serde(default)]
    pub end: Option<String>,
}

impl DateRange {
    /// Create a range from two bounds.
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: Some(start.into()), end: Some(end.into()) }
    }

    /// Both bounds, trimmed, when neither is empty.
    #[must_use]
    pub fn bounds(&self) -> Option<(&str, &str)> {
        let start = self.start.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let end = self.end.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((start, end))
    }
}

/// Body of a search POST.
///
/// Every field is optional; which ones are used depends on the active
/// [`SearchProfile`](crate::config::SearchProfile).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// General free-text query.
    #[serde(default, alias = "query")]
    pub keywords: Option<String>,

    /// Medicine term.
    #[serde(default)]
    pub medicine: Option<String>,

    /// Condition term.
    #[serde(default)]
    pub condition: Option<String>,

    /// Journals to restrict the search to. `null` counts as none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub journal_names: Vec<String>,

    /// Publication date range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

/// Successful response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Sorted results.
    pub papers: Vec<Paper>,

    /// Informational message, set when there are no results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchResponse {
    /// Wrap a result list, adding the empty-result message when needed.
    #[must_use]
    pub fn new(papers: Vec<Paper>) -> Self {
        let message = papers.is_empty().then(|| NO_RESULTS_MESSAGE.to_string());
        Self { papers, message }
    }

    /// Response for a search that matched nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,

    /// Always empty.
    pub papers: Vec<Paper>,
}

impl ErrorResponse {
    /// Create an error envelope.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), papers: Vec::new() }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
