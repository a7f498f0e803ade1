//! PubMed query string construction.

use crate::config::{InputField, SearchProfile};
use crate::models::SearchRequest;

/// Build an E-utilities `term` from a search request.
///
/// Each recognized, non-empty field becomes a parenthesized term; terms are
/// joined with `AND` in the order primary terms, journals, date range.
/// Returns an empty string when nothing usable is present.
#[must_use]
pub fn build_query(request: &SearchRequest, profile: &SearchProfile) -> String {
    let mut terms = Vec::new();

    let primary = [
        (InputField::Keywords, &request.keywords),
        (InputField::Medicine, &request.medicine),
        (InputField::Condition, &request.condition),
    ];
    for (field, value) in primary {
        if !profile.accepts(field) {
            continue;
        }
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            terms.push(format!("({value})"));
        }
    }

    if profile.accepts(InputField::JournalNames) {
        if let Some(journals) = journal_term(&request.journal_names) {
            terms.push(journals);
        }
    }

    if profile.accepts(InputField::DateRange) {
        if let Some((start, end)) = request.date_range.as_ref().and_then(|r| r.bounds()) {
            terms.push(format!(
                "(\"{start}\"[Date - Publication] : \"{end}\"[Date - Publication])"
            ));
        }
    }

    terms.join(" AND ")
}

fn journal_term(names: &[String]) -> Option<String> {
    let clauses: Vec<String> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| format!("\"{name}\"[Journal]"))
        .collect();

    if clauses.is_empty() { None } else { Some(format!("({})", clauses.join(" OR "))) }
}
