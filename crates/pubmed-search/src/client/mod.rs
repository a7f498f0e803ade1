//! NCBI E-utilities client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff for transient failures
//! - Contact identification (email, tool, API key) on every request
//!
//! The [`LiteratureSource`] trait is the seam between the search pipeline
//! and the upstream service.

mod parser;
mod responses;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    Retryable, RetryableStrategy, RetryTransientMiddleware, default_on_request_failure,
    policies::ExponentialBackoff,
};
use tracing::{debug, instrument, warn};

pub use parser::parse_articles;

use self::responses::{ELinkResponse, ESearchResponse};
use crate::config::{CitationLink, Config, api};
use crate::error::{ClientError, ClientResult};
use crate::models::RawRecord;

/// Operations the search pipeline needs from a bibliographic database.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Identifiers matching `query`, in upstream order.
    async fn search(&self, query: &str, max_results: u32, sort: &str) -> ClientResult<Vec<String>>;

    /// Full records for `ids`, fetched in one batch.
    async fn fetch(&self, ids: &[String]) -> ClientResult<Vec<RawRecord>>;

    /// Number of documents citing `id`.
    async fn citation_count(&self, id: &str) -> ClientResult<usize>;
}

/// PubMed E-utilities client.
#[derive(Clone)]
pub struct PubMedClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// E-utilities base URL.
    base_url: String,

    /// Contact parameters (email, tool, api_key).
    contact_params: Vec<(String, String)>,

    /// ELink target for citation counts.
    citation_link: CitationLink,

    /// Request timeout, reported on timeouts.
    request_timeout: Duration,
}

impl PubMedClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the contact email is empty or HTTP client
    /// initialization fails.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.email.trim().is_empty(), "contact email must not be empty");

        let client = Client::builder()
            .user_agent(format!("{}/{}", config.tool, env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(5))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                RetryableStatus,
            ))
            .build();

        Ok(Self {
            client,
            contact_params: config.contact_params(),
            base_url: config.eutils_url,
            citation_link: config.citation_link,
            request_timeout: config.request_timeout,
        })
    }

    /// Check if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.contact_params.iter().any(|(k, _)| k == "api_key")
    }

    /// Search PubMed and return matching PMIDs.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or when ESearch reports an error.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search_ids(
        &self,
        query: &str,
        max_results: u32,
        sort: &str,
    ) -> ClientResult<Vec<String>> {
        let params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("term".to_string(), query.to_string()),
            ("retmax".to_string(), max_results.to_string()),
            ("sort".to_string(), sort.to_string()),
            ("retmode".to_string(), "json".to_string()),
        ];

        let result: ESearchResponse = self.get_json("esearch.fcgi", params).await?;
        if let Some(message) = result.error {
            return Err(ClientError::upstream(message));
        }
        let data = result
            .esearchresult
            .ok_or_else(|| ClientError::upstream("ESearch response has no esearchresult"))?;
        if let Some(message) = data.error {
            return Err(ClientError::upstream(message));
        }

        debug!(results_found = data.idlist.len(), "Search completed");
        Ok(data.idlist)
    }

    /// Fetch full records for a batch of PMIDs.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or malformed XML.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn fetch_records(&self, ids: &[String]) -> ClientResult<Vec<RawRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("id".to_string(), ids.join(",")),
            ("retmode".to_string(), "xml".to_string()),
        ];

        let xml = self.get_text("efetch.fcgi", params).await?;
        let records = parse_articles(&xml)?;

        if records.len() != ids.len() {
            let missing: Vec<&str> = ids
                .iter()
                .map(String::as_str)
                .filter(|id| !records.iter().any(|r| r.pmid.as_deref() == Some(*id)))
                .collect();
            warn!(
                requested = ids.len(),
                received = records.len(),
                missing = %missing.join(","),
                "EFetch returned a partial batch"
            );
        }
        Ok(records)
    }

    /// Count citing documents for a PMID via ELink.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or when ELink reports an error.
    #[instrument(skip(self), fields(pmid = %pmid))]
    pub async fn count_citations(&self, pmid: &str) -> ClientResult<usize> {
        let params = vec![
            ("dbfrom".to_string(), "pubmed".to_string()),
            ("db".to_string(), self.citation_link.db.clone()),
            ("linkname".to_string(), self.citation_link.linkname.clone()),
            ("id".to_string(), pmid.to_string()),
            ("retmode".to_string(), "json".to_string()),
        ];

        let result: ELinkResponse = self.get_json("elink.fcgi", params).await?;
        if let Some(message) = result.error {
            return Err(ClientError::upstream(message));
        }

        Ok(result.link_count(&self.citation_link.linkname))
    }

    /// Make a GET request and decode a JSON body.
    async fn get_json<T>(&self, endpoint: &str, params: Vec<(String, String)>) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let text = self.get_text(endpoint, params).await?;
        serde_json::from_str(&text).map_err(ClientError::from)
    }

    /// Make a GET request with contact parameters and return the body.
    async fn get_text(
        &self,
        endpoint: &str,
        mut params: Vec<(String, String)>,
    ) -> ClientResult<String> {
        let url = format!("{}/{}", self.base_url, endpoint);
        params.extend(self.contact_params.iter().cloned());

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = self.handle_response(response).await?;
        response.text().await.map_err(|e| self.map_reqwest_error(e))
    }

    fn map_send_error(&self, err: reqwest_middleware::Error) -> ClientError {
        match err {
            reqwest_middleware::Error::Reqwest(e) => self.map_reqwest_error(e),
            other => ClientError::Middleware(other),
        }
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.request_timeout)
        } else {
            ClientError::Http(err)
        }
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let text = if status.as_u16() == 429 {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };

        Err(ClientError::from_status(status.as_u16(), retry_after, text))
    }
}

/// Retries exactly the responses [`ClientError::is_retryable`] accepts.
#[derive(Debug, Clone, Copy)]
struct RetryableStatus;

impl RetryableStrategy for RetryableStatus {
    fn handle(
        &self,
        res: &Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match res {
            Ok(response) if response.status().is_success() => None,
            Ok(response) => {
                let err = ClientError::from_status(response.status().as_u16(), None, String::new());
                Some(if err.is_retryable() { Retryable::Transient } else { Retryable::Fatal })
            }
            Err(e) => default_on_request_failure(e),
        }
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    async fn search(&self, query: &str, max_results: u32, sort: &str) -> ClientResult<Vec<String>> {
        self.search_ids(query, max_results, sort).await
    }

    async fn fetch(&self, ids: &[String]) -> ClientResult<Vec<RawRecord>> {
        self.fetch_records(ids).await
    }

    async fn citation_count(&self, id: &str) -> ClientResult<usize> {
        self.count_citations(id).await
    }
}

impl std::fmt::Debug for PubMedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubMedClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.has_api_key())
            .finish()
    }
}
