#![no_main]

use libfuzzer_sys::fuzz_target;
use pubmed_search::config::SearchProfile;
use pubmed_search::models::SearchRequest;
use pubmed_search::query::build_query;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<SearchRequest>(data) {
        let _ = build_query(&request, &SearchProfile::keywords());
        let _ = build_query(&request, &SearchProfile::clinical());
    }
});
