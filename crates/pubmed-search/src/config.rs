//! Configuration for the PubMed search function.
//!
//! [`Config`] describes how to reach NCBI E-utilities; [`SearchProfile`]
//! describes which request fields a deployment recognizes and how results
//! are ordered.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for NCBI E-utilities.
    pub const EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

    /// Tool name reported to NCBI with every request.
    pub const TOOL_NAME: &str = "pubmed-search";

    /// Request timeout per upstream call.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Retries for transient upstream failures.
    pub const MAX_RETRIES: u32 = 2;

    /// Citation lookups allowed in flight per request.
    ///
    /// NCBI allows 3 req/s without an API key.
    pub const CITATION_CONCURRENCY: usize = 3;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// ELink target used to derive citation counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationLink {
    /// Target database (`pubmed` or `pmc`).
    pub db: String,

    /// Link name whose links are counted.
    pub linkname: String,
}

impl CitationLink {
    /// PubMed articles citing the record.
    #[must_use]
    pub fn pubmed_citedin() -> Self {
        Self { db: "pubmed".to_string(), linkname: "pubmed_pubmed_citedin".to_string() }
    }

    /// PMC full-text articles referencing the record.
    #[must_use]
    pub fn pmc_refs() -> Self {
        Self { db: "pmc".to_string(), linkname: "pubmed_pmc_refs".to_string() }
    }
}

impl Default for CitationLink {
    fn default() -> Self {
        Self::pubmed_citedin()
    }
}

/// Upstream client configuration.
#[derive(Clone)]
pub struct Config {
    /// Contact email NCBI requires on every request.
    pub email: String,

    /// Tool name NCBI requires on every request.
    pub tool: String,

    /// NCBI API key (optional, raises the upstream rate limit).
    pub api_key: Option<String>,

    /// Base URL for E-utilities (for testing with mock servers).
    pub eutils_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Retries for transient failures (0 disables retrying).
    pub max_retries: u32,

    /// Citation lookups in flight per request.
    pub citation_concurrency: usize,

    /// ELink target for citation counts.
    pub citation_link: CitationLink,
}

impl Config {
    /// Create a configuration for the given contact email.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            tool: api::TOOL_NAME.to_string(),
            api_key: None,
            eutils_url: api::EUTILS_URL.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            max_retries: api::MAX_RETRIES,
            citation_concurrency: api::CITATION_CONCURRENCY,
            citation_link: CitationLink::default(),
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            email: "test@example.com".to_string(),
            tool: "pubmed-search-test".to_string(),
            api_key: None,
            eutils_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            max_retries: 0, // Fail fast in tests
            citation_concurrency: 3,
            citation_link: CitationLink::default(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// `NCBI_EMAIL` is required; `NCBI_API_KEY`, `NCBI_TOOL` and
    /// `EUTILS_URL` are optional.
    ///
    /// # Errors
    ///
    /// Returns error if `NCBI_EMAIL` is missing or empty.
    pub fn from_env() -> anyhow::Result<Self> {
        let email = std::env::var("NCBI_EMAIL").context("NCBI_EMAIL must be set")?;
        anyhow::ensure!(!email.trim().is_empty(), "NCBI_EMAIL must not be empty");

        let mut config = Self::new(email);
        config.api_key = std::env::var("NCBI_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(tool) = std::env::var("NCBI_TOOL") {
            config.tool = tool;
        }
        if let Ok(url) = std::env::var("EUTILS_URL") {
            config.eutils_url = url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// Set the NCBI API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the ELink target used for citation counts.
    #[must_use]
    pub fn with_citation_link(mut self, link: CitationLink) -> Self {
        self.citation_link = link;
        self
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Contact parameters appended to every E-utilities request.
    #[must_use]
    pub fn contact_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("email".to_string(), self.email.clone()),
            ("tool".to_string(), self.tool.clone()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }
        params
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("email", &self.email)
            .field("tool", &self.tool)
            .field("has_api_key", &self.has_api_key())
            .field("eutils_url", &self.eutils_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Request fields a search profile can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    /// General free-text query.
    Keywords,
    /// Medicine term.
    Medicine,
    /// Condition term.
    Condition,
    /// Journal name filter.
    JournalNames,
    /// Publication date range.
    DateRange,
}

/// Key used to order the response, always descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Most cited first.
    #[default]
    Citations,
    /// Most recent first.
    Year,
}

/// Which inputs a deployment accepts and how it orders results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchProfile {
    /// Recognized request fields; others are ignored.
    pub fields: Vec<InputField>,

    /// Response ordering.
    pub sort_key: SortKey,

    /// Result cap passed to ESearch as `retmax`.
    pub max_results: u32,

    /// ESearch `sort` parameter.
    pub upstream_sort: String,

    /// Whether to look up citation counts.
    pub enrich_citations: bool,
}

impl SearchProfile {
    /// Free-text keyword search, most cited first.
    #[must_use]
    pub fn keywords() -> Self {
        Self {
            fields: vec![InputField::Keywords, InputField::DateRange],
            sort_key: SortKey::Citations,
            max_results: 25,
            upstream_sort: "relevance".to_string(),
            enrich_citations: true,
        }
    }

    /// Medicine/condition search with journal filter, most recent first.
    #[must_use]
    pub fn clinical() -> Self {
        Self {
            fields: vec![
                InputField::Medicine,
                InputField::Condition,
                InputField::JournalNames,
                InputField::DateRange,
            ],
            sort_key: SortKey::Year,
            max_results: 100,
            upstream_sort: "relevance".to_string(),
            enrich_citations: true,
        }
    }

    /// Check whether a request field is recognized.
    #[must_use]
    pub fn accepts(&self, field: InputField) -> bool {
        self.fields.contains(&field)
    }
}

impl Default for SearchProfile {
    fn default() -> Self {
        Self::keywords()
    }
}
