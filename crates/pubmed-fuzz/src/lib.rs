//! Fuzzing library for pubmed-search.
//!
//! Targets cover the EFetch XML parser and request decoding, the two places
//! untrusted bytes enter the function.
//!
//! # Usage
//!
//! ```bash
//! cd crates/pubmed-fuzz
//! cargo +nightly fuzz run fuzz_efetch_parse -- -max_total_time=60
//! ```

pub use pubmed_search::{client::parse_articles, models};
