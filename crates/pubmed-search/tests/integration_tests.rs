//! Integration tests against the live NCBI E-utilities.
//!
//! Run with: `NCBI_EMAIL=you@example.com cargo test --features integration -- --nocapture`

#![cfg(feature = "integration")]

use std::sync::Arc;

use axum::http::StatusCode;
use pubmed_search::client::{LiteratureSource, PubMedClient};
use pubmed_search::config::{CitationLink, Config, SearchProfile};
use pubmed_search::pipeline::SearchPipeline;
use pubmed_search::server::{HttpRequest, dispatch};

/// Well-known PMIDs for testing.
mod pmids {
    /// "A Novel Coronavirus from Patients with Pneumonia in China, 2019"
    pub const NOVEL_CORONAVIRUS: &str = "31978945";
}

fn create_client() -> PubMedClient {
    let config = Config::from_env().unwrap_or_else(|_| Config::new("integration@example.com"));
    PubMedClient::new(config).expect("Failed to create client")
}

// =============================================================================
// Client Tests
// =============================================================================

#[tokio::test]
async fn test_search_returns_ids() {
    let client = create_client();
    let ids = client.search("(crispr) AND (sickle cell)", 5, "relevance").await.unwrap();
    assert!(!ids.is_empty());
    assert!(ids.len() <= 5);
    assert!(ids.iter().all(|id| id.chars().all(|c| c.is_ascii_digit())));
}

#[tokio::test]
async fn test_fetch_known_article() {
    let client = create_client();
    let records = client.fetch(&[pmids::NOVEL_CORONAVIRUS.to_string()]).await.unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.pmid.as_deref(), Some(pmids::NOVEL_CORONAVIRUS));
    assert!(record.title.as_deref().unwrap_or_default().contains("Coronavirus"));
    assert!(!record.authors.is_empty());
    assert!(record.pub_date.as_deref().unwrap_or_default().starts_with("2020"));
}

#[tokio::test]
async fn test_citation_count_for_known_article() {
    let client = create_client();
    let count = client.citation_count(pmids::NOVEL_CORONAVIRUS).await.unwrap();
    assert!(count > 100, "expected a heavily cited article, got {count}");
}

#[tokio::test]
async fn test_pmc_citation_link() {
    let config = Config::from_env()
        .unwrap_or_else(|_| Config::new("integration@example.com"))
        .with_citation_link(CitationLink::pmc_refs());
    let client = PubMedClient::new(config).unwrap();
    let count = client.citation_count(pmids::NOVEL_CORONAVIRUS).await.unwrap();
    assert!(count > 0);
}

// =============================================================================
// End-to-End
// =============================================================================

#[tokio::test]
async fn test_keywords_search_end_to_end() {
    let pipeline = SearchPipeline::new(Arc::new(create_client()), SearchProfile::keywords());
    let response =
        dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "mRNA vaccine myocarditis"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    let papers = body["papers"].as_array().unwrap();
    assert!(!papers.is_empty());
    assert!(papers.len() <= 25);

    let citations: Vec<u64> = papers.iter().map(|p| p["citations"].as_u64().unwrap()).collect();
    assert!(citations.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_clinical_search_end_to_end() {
    let pipeline = SearchPipeline::new(Arc::new(create_client()), SearchProfile::clinical());
    let response = dispatch(
        &pipeline,
        HttpRequest::post(
            r#"{"medicine": "metformin", "condition": "type 2 diabetes",
                "dateRange": {"start": "2020", "end": "2022"}}"#,
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    let years: Vec<u64> =
        body["papers"].as_array().unwrap().iter().map(|p| p["year"].as_u64().unwrap()).collect();
    assert!(years.windows(2).all(|w| w[0] >= w[1]));
}
