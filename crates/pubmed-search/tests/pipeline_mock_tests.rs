//! Mock-based pipeline tests using wiremock.
//!
//! These tests drive the full handler against a mocked E-utilities server.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pubmed_search::client::PubMedClient;
use pubmed_search::config::{Config, SearchProfile};
use pubmed_search::pipeline::SearchPipeline;
use pubmed_search::server::{HttpRequest, dispatch};

/// Create a pipeline backed by the mock server.
fn setup_pipeline(mock_server: &MockServer, profile: SearchProfile) -> SearchPipeline {
    let config = Config::for_testing(&mock_server.uri());
    let client = PubMedClient::new(config).unwrap();
    SearchPipeline::new(Arc::new(client), profile)
}

/// ESearch JSON body.
fn esearch_json(ids: &[&str]) -> serde_json::Value {
    json!({
        "header": {"type": "esearch", "version": "0.3"},
        "esearchresult": {
            "count": ids.len().to_string(),
            "retmax": ids.len().to_string(),
            "retstart": "0",
            "idlist": ids
        }
    })
}

/// ELink JSON body with `count` citing PMIDs.
fn elink_json(pmid: &str, count: usize) -> serde_json::Value {
    let links: Vec<String> = (0..count).map(|i| format!("9{i:07}")).collect();
    if links.is_empty() {
        return json!({"linksets": [{"dbfrom": "pubmed", "ids": [pmid]}]});
    }
    json!({
        "linksets": [{
            "dbfrom": "pubmed",
            "ids": [pmid],
            "linksetdbs": [{"dbto": "pubmed", "linkname": "pubmed_pubmed_citedin", "links": links}]
        }]
    })
}

/// One EFetch `PubmedArticle` element.
fn article_xml(pmid: &str, title: &str, year: &str) -> String {
    format!(
        r#"<PubmedArticle><MedlineCitation Status="MEDLINE" Owner="NLM">
<PMID Version="1">{pmid}</PMID>
<Article PubModel="Print">
<Journal><JournalIssue><PubDate><Year>{year}</Year><Month>Mar</Month></PubDate></JournalIssue>
<Title>Journal of Tests</Title><ISOAbbreviation>J Tests</ISOAbbreviation></Journal>
<ArticleTitle>{title}</ArticleTitle>
<Abstract><AbstractText>Abstract for {title}</AbstractText></Abstract>
<AuthorList><Author><LastName>Doe</LastName><ForeName>Jane</ForeName></Author></AuthorList>
</Article></MedlineCitation></PubmedArticle>"#
    )
}

fn efetch_xml(articles: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" ?>\n<PubmedArticleSet>{}</PubmedArticleSet>",
        articles.join("\n")
    )
}

async fn mount_three_articles(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_json(&["1", "2", "3"])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "1,2,3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(efetch_xml(&[
            article_xml("1", "Older Paper", "2019"),
            article_xml("2", "Newest Paper", "2023"),
            article_xml("3", "Middle Paper", "2020"),
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_citations(mock_server: &MockServer, pmid: &str, count: usize) {
    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .and(query_param("id", pmid))
        .respond_with(ResponseTemplate::new(200).set_body_json(elink_json(pmid, count)))
        .mount(mock_server)
        .await;
}

fn ids(body: &serde_json::Value) -> Vec<&str> {
    body["papers"].as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect()
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn test_keywords_search_sorted_by_citations() {
    let mock_server = MockServer::start().await;
    mount_three_articles(&mock_server).await;
    mount_citations(&mock_server, "1", 5).await;
    mount_citations(&mock_server, "2", 20).await;
    mount_citations(&mock_server, "3", 1).await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    let citations: Vec<u64> = body["papers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["citations"].as_u64().unwrap())
        .collect();
    assert_eq!(citations, vec![20, 5, 1]);
    assert!(body.get("message").is_none());

    let top = &body["papers"][0];
    assert_eq!(top["id"], "2");
    assert_eq!(top["title"], "Newest Paper");
    assert_eq!(top["abstract"], "Abstract for Newest Paper");
    assert_eq!(top["authors"], json!(["Doe Jane"]));
    assert_eq!(top["journal"], "Journal of Tests");
    assert_eq!(top["year"], 2023);
}

#[tokio::test]
async fn test_clinical_search_sorted_by_year() {
    let mock_server = MockServer::start().await;
    mount_three_articles(&mock_server).await;
    mount_citations(&mock_server, "1", 0).await;
    mount_citations(&mock_server, "2", 0).await;
    mount_citations(&mock_server, "3", 0).await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::clinical());
    let response = dispatch(
        &pipeline,
        HttpRequest::post(r#"{"medicine": "aspirin", "condition": "headache"}"#),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    let years: Vec<u64> = body["papers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["year"].as_u64().unwrap())
        .collect();
    assert_eq!(years, vec![2023, 2020, 2019]);
}

#[tokio::test]
async fn test_search_sends_query_and_contact_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param(
            "term",
            "(aspirin) AND (headache) AND (\"2020\"[Date - Publication] : \"2021\"[Date - Publication])",
        ))
        .and(query_param("retmax", "100"))
        .and(query_param("sort", "relevance"))
        .and(query_param("email", "test@example.com"))
        .and(query_param("tool", "pubmed-search-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_json(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::clinical());
    let response = dispatch(
        &pipeline,
        HttpRequest::post(
            r#"{"medicine": "aspirin", "condition": "headache",
                "dateRange": {"start": "2020", "end": "2021"}}"#,
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
}

// =============================================================================
// Empty Results
// =============================================================================

#[tokio::test]
async fn test_no_matching_ids_returns_empty_papers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_json(&[])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "zzzz"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    assert_eq!(body["papers"], json!([]));
    assert_eq!(body["message"], "No results found");
}

#[tokio::test]
async fn test_empty_request_skips_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::clinical());
    let response = dispatch(&pipeline, HttpRequest::post("{}")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json_body().unwrap()["papers"], json!([]));
}

// =============================================================================
// Failure Handling
// =============================================================================

#[tokio::test]
async fn test_citation_failure_is_isolated() {
    let mock_server = MockServer::start().await;
    mount_three_articles(&mock_server).await;
    mount_citations(&mock_server, "1", 5).await;
    mount_citations(&mock_server, "3", 1).await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    assert_eq!(ids(&body), vec!["1", "3", "2"]);
    assert_eq!(body["papers"][2]["citations"], 0);
}

#[tokio::test]
async fn test_malformed_elink_body_counts_zero() {
    let mock_server = MockServer::start().await;
    mount_three_articles(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    assert_eq!(ids(&body), vec!["1", "2", "3"]);
    assert!(body["papers"].as_array().unwrap().iter().all(|p| p["citations"] == 0));
}

#[tokio::test]
async fn test_search_server_error_returns_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers["access-control-allow-origin"], "*");
    let body = response.json_body().unwrap();
    assert!(body["error"].as_str().unwrap().contains("search failed"));
    assert_eq!(body["papers"], json!([]));
}

#[tokio::test]
async fn test_esearch_error_field_returns_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"esearchresult": {"ERROR": "Invalid query syntax"}})),
        )
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "(("}"#)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json_body().unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid query syntax"));
}

#[tokio::test]
async fn test_rate_limited_search_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json_body().unwrap();
    assert!(body["error"].as_str().unwrap().contains("Rate limited"));
}

#[tokio::test]
async fn test_fetch_failure_returns_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_json(&["1"])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json_body().unwrap();
    assert!(body["error"].as_str().unwrap().contains("fetch failed"));
    assert_eq!(body["papers"], json!([]));
}

#[tokio::test]
async fn test_record_without_pmid_is_skipped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_json(&["1", "2"])))
        .mount(&mock_server)
        .await;

    let broken = "<PubmedArticle><MedlineCitation><Article>\
                  <ArticleTitle>Lost</ArticleTitle></Article></MedlineCitation></PubmedArticle>"
        .to_string();
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(efetch_xml(&[article_xml("1", "Kept", "2021"), broken])),
        )
        .mount(&mock_server)
        .await;

    mount_citations(&mock_server, "1", 2).await;

    let pipeline = setup_pipeline(&mock_server, SearchProfile::keywords());
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    assert_eq!(ids(&body), vec!["1"]);
    assert_eq!(body["papers"][0]["citations"], 2);
}

#[tokio::test]
async fn test_enrichment_disabled_makes_no_elink_calls() {
    let mock_server = MockServer::start().await;
    mount_three_articles(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let profile = SearchProfile { enrich_citations: false, ..SearchProfile::clinical() };
    let pipeline = setup_pipeline(&mock_server, profile);
    let response =
        dispatch(&pipeline, HttpRequest::post(r#"{"condition": "asthma"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json_body().unwrap();
    assert_eq!(ids(&body), vec!["2", "3", "1"]);
}

// =============================================================================
// Retry Behavior
// =============================================================================

fn retrying_pipeline(mock_server: &MockServer, max_retries: u32) -> SearchPipeline {
    let config = Config { max_retries, ..Config::for_testing(&mock_server.uri()) };
    let client = PubMedClient::new(config).unwrap();
    SearchPipeline::new(Arc::new(client), SearchProfile::keywords())
}

#[tokio::test]
async fn test_transient_search_failure_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_json(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let pipeline = retrying_pipeline(&mock_server, 1);
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json_body().unwrap()["papers"], json!([]));
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad term"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let pipeline = retrying_pipeline(&mock_server, 2);
    let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "covid"}"#)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json_body().unwrap()["error"].as_str().unwrap().contains("bad term"));
}
