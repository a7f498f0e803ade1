//! PubMed Search Function
//!
//! An HTTP-triggered search over PubMed. A JSON request is turned into an
//! E-utilities query, matching records are fetched and normalized, each is
//! enriched with a citation count, and the sorted list is returned as JSON
//! with CORS headers for browser clients.
//!
//! # Features
//!
//! - **Configurable profiles**: keyword search sorted by citations, or
//!   medicine/condition/journal search sorted by year
//! - **Best-effort enrichment**: citation lookups run concurrently and never
//!   fail a request
//! - **Framework-independent dispatch**: the handler takes a tagged request
//!   and can be driven without a server
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pubmed_search::{PubMedClient, SearchPipeline, config::{Config, SearchProfile}};
//! use pubmed_search::server::{HttpRequest, dispatch};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PubMedClient::new(Config::new("dev@example.com"))?;
//!     let pipeline = SearchPipeline::new(Arc::new(client), SearchProfile::keywords());
//!
//!     let response = dispatch(&pipeline, HttpRequest::post(r#"{"keywords": "crispr"}"#)).await;
//!     println!("{}", response.status);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod server;

pub use client::{LiteratureSource, PubMedClient};
pub use config::Config;
pub use error::{ClientError, HandlerError};
pub use pipeline::SearchPipeline;
