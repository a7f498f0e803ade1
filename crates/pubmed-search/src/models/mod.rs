//! Data models for search requests, upstream records and results.
//!
//! Request models use `#[serde(default)]` for every field so partial
//! bodies deserialize; output models always carry every field.

mod paper;
mod request;

pub use paper::{
    DEFAULT_ABSTRACT, DEFAULT_JOURNAL, DEFAULT_TITLE, Paper, RawRecord, parse_year,
};
pub use request::{DateRange, ErrorResponse, NO_RESULTS_MESSAGE, SearchRequest, SearchResponse};
