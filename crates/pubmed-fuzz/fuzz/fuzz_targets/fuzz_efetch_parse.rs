#![no_main]

use libfuzzer_sys::fuzz_target;
use pubmed_search::client::parse_articles;
use pubmed_search::models::Paper;

fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };
    // Malformed XML must come back as Err, never a panic
    if let Ok(records) = parse_articles(xml) {
        for record in records {
            let _ = Paper::from_record(record);
        }
    }
});
