//! Search pipeline: query, fetch, normalize, enrich, sort.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::client::LiteratureSource;
use crate::config::{SearchProfile, SortKey, api};
use crate::error::{HandlerError, HandlerResult};
use crate::models::{Paper, RawRecord, SearchRequest, SearchResponse};
use crate::query::build_query;

/// Request lifecycle stages, used in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Waiting for a request.
    AwaitingRequest,
    /// Decoding the JSON body.
    ParsingBody,
    /// Turning the request into a PubMed term.
    BuildingQuery,
    /// ESearch in flight.
    Searching,
    /// EFetch in flight.
    Fetching,
    /// ELink lookups in flight.
    Enriching,
    /// Writing the response.
    Responding,
    /// Terminal error state.
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingRequest => "awaiting_request",
            Self::ParsingBody => "parsing_body",
            Self::BuildingQuery => "building_query",
            Self::Searching => "searching",
            Self::Fetching => "fetching",
            Self::Enriching => "enriching",
            Self::Responding => "responding",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One configured search handler.
///
/// Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct SearchPipeline {
    source: Arc<dyn LiteratureSource>,
    profile: SearchProfile,
    citation_concurrency: usize,
}

impl SearchPipeline {
    /// Create a pipeline over an upstream source.
    #[must_use]
    pub fn new(source: Arc<dyn LiteratureSource>, profile: SearchProfile) -> Self {
        Self { source, profile, citation_concurrency: api::CITATION_CONCURRENCY }
    }

    /// Set how many citation lookups may run at once.
    #[must_use]
    pub fn with_citation_concurrency(mut self, concurrency: usize) -> Self {
        self.citation_concurrency = concurrency.max(1);
        self
    }

    /// Active search profile.
    #[must_use]
    pub const fn profile(&self) -> &SearchProfile {
        &self.profile
    }

    /// Run a search request through every stage.
    ///
    /// An empty query or an empty id list yields an empty, successful
    /// response without further upstream calls.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UpstreamSearch`] or
    /// [`HandlerError::UpstreamFetch`] when those calls fail. Per-record and
    /// citation failures are logged and never returned.
    pub async fn run(&self, request: &SearchRequest) -> HandlerResult<SearchResponse> {
        debug!(stage = %Stage::BuildingQuery, "Building query");
        let query = build_query(request, &self.profile);
        if query.is_empty() {
            info!("No search terms provided, returning empty result");
            return Ok(SearchResponse::empty());
        }

        debug!(stage = %Stage::Searching, query = %query, "Searching PubMed");
        let ids = match self
            .source
            .search(&query, self.profile.max_results, &self.profile.upstream_sort)
            .await
        {
            Ok(ids) => ids,
            Err(source) => {
                error!(stage = %Stage::Failed, query = %query, error = %source, "Search failed");
                return Err(HandlerError::UpstreamSearch { query, source });
            }
        };

        if ids.is_empty() {
            info!(query = %query, "No matching articles");
            return Ok(SearchResponse::empty());
        }

        debug!(stage = %Stage::Fetching, count = ids.len(), "Fetching records");
        let records = match self.source.fetch(&ids).await {
            Ok(records) => records,
            Err(source) => {
                error!(
                    stage = %Stage::Failed,
                    query = %query,
                    ids = %ids.join(","),
                    error = %source,
                    "Fetch failed"
                );
                return Err(HandlerError::UpstreamFetch { ids, source });
            }
        };

        let mut papers = normalize(records);

        if self.profile.enrich_citations {
            debug!(stage = %Stage::Enriching, count = papers.len(), "Looking up citations");
            papers = self.enrich(papers).await;
        }

        sort_papers(&mut papers, self.profile.sort_key);
        info!(query = %query, results = papers.len(), "Search completed");
        Ok(SearchResponse::new(papers))
    }

    /// Fill in citation counts, keeping input order.
    ///
    /// A failed lookup leaves that paper at 0 and does not affect others.
    async fn enrich(&self, papers: Vec<Paper>) -> Vec<Paper> {
        let source = &self.source;
        stream::iter(papers)
            .map(|mut paper| async move {
                match source.citation_count(&paper.id).await {
                    Ok(count) => paper.citations = count,
                    Err(e) => {
                        warn!(pmid = %paper.id, error = %e, "Citation lookup failed, using 0");
                    }
                }
                paper
            })
            .buffered(self.citation_concurrency)
            .collect()
            .await
    }
}

impl fmt::Debug for SearchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchPipeline")
            .field("profile", &self.profile)
            .field("citation_concurrency", &self.citation_concurrency)
            .finish()
    }
}

/// Normalize fetched records, skipping any that cannot become a paper.
#[must_use]
pub fn normalize(records: Vec<RawRecord>) -> Vec<Paper> {
    records
        .into_iter()
        .filter_map(|record| {
            let title = record.title.clone();
            match Paper::from_record(record) {
                Ok(paper) => Some(paper),
                Err(e) => {
                    warn!(title = ?title, error = %e, "Skipping record");
                    None
                }
            }
        })
        .collect()
}

/// Sort descending by `key`; ties keep their current order.
pub fn sort_papers(papers: &mut [Paper], key: SortKey) {
    match key {
        SortKey::Citations => papers.sort_by(|a, b| b.citations.cmp(&a.citations)),
        SortKey::Year => papers.sort_by(|a, b| b.year.cmp(&a.year)),
    }
}
