//! EFetch XML parsing.
//!
//! Walks the `PubmedArticleSet` with a streaming reader and collects one
//! [`RawRecord`] per `PubmedArticle` or `PubmedBookArticle`. No defaults are applied here; missing
//! elements stay `None` and are handled during normalization.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument};

use crate::error::ClientResult;
use crate::models::RawRecord;

/// Parse an EFetch `retmode=xml` document.
///
/// # Errors
///
/// Returns [`ClientError::Xml`](crate::error::ClientError::Xml) on malformed XML.
#[instrument(skip(xml), fields(xml_size = xml.len()))]
pub fn parse_articles(xml: &str) -> ClientResult<Vec<RawRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<String> = Vec::new();
    let mut records = Vec::new();
    let mut current: Option<ArticleBuilder> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let name = element_name(e);
                if is_record(&name) {
                    current = Some(ArticleBuilder::default());
                }
                if let Some(builder) = current.as_mut() {
                    builder.open(&name, &path, e);
                }
                path.push(name);
            }
            Event::End(_) => {
                let name = path.pop().unwrap_or_default();
                if let Some(builder) = current.as_mut() {
                    builder.close(&name, &path);
                }
                if is_record(&name) {
                    if let Some(builder) = current.take() {
                        records.push(builder.finish());
                    }
                }
            }
            Event::Text(ref t) => {
                if let Some(builder) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(t).into_owned());
                    builder.text(&path, &text);
                }
            }
            Event::CData(ref c) => {
                if let Some(builder) = current.as_mut() {
                    builder.text(&path, &String::from_utf8_lossy(c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(records = records.len(), "Parsed EFetch response");
    Ok(records)
}

fn is_record(name: &str) -> bool {
    name == "PubmedArticle" || name == "PubmedBookArticle"
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parent(path: &[String]) -> Option<&str> {
    path.last().map(String::as_str)
}

fn within(path: &[String], element: &str) -> bool {
    path.iter().any(|p| p == element)
}

/// Author lists of the record itself, not book editors.
fn is_record_author_list(path: &[String]) -> bool {
    let grandparent = path.len().checked_sub(2).map(|i| path[i].as_str());
    within(path, "Article") || grandparent == Some("BookDocument")
}

#[derive(Debug, Default)]
struct AuthorParts {
    last_name: String,
    fore_name: String,
    collective_name: String,
}

impl AuthorParts {
    fn name(&self) -> Option<String> {
        let personal = collapse_whitespace(&format!("{} {}", self.last_name, self.fore_name));
        if !personal.is_empty() {
            return Some(personal);
        }
        let collective = collapse_whitespace(&self.collective_name);
        (!collective.is_empty()).then_some(collective)
    }
}

#[derive(Debug, Default)]
struct ArticleBuilder {
    pmid: Option<String>,
    title: String,
    vernacular_title: String,
    sections: Vec<String>,
    section: Option<String>,
    authors: Vec<String>,
    author: Option<AuthorParts>,
    journal_title: String,
    iso_abbreviation: String,
    book_title: String,
    year: String,
    month: String,
    day: String,
    medline_date: String,
}

impl ArticleBuilder {
    fn open(&mut self, name: &str, path: &[String], e: &BytesStart<'_>) {
        match (name, parent(path)) {
            ("AbstractText", Some("Abstract")) => {
                let label = attribute(e, b"Label").filter(|l| !l.trim().is_empty());
                self.section = Some(label.map(|l| format!("{}: ", l.trim())).unwrap_or_default());
            }
            ("Author", Some("AuthorList")) if is_record_author_list(path) => {
                self.author = Some(AuthorParts::default());
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str, path: &[String]) {
        match (name, parent(path)) {
            ("AbstractText", Some("Abstract")) => {
                if let Some(section) = self.section.take() {
                    let section = collapse_whitespace(&section);
                    if !section.is_empty() {
                        self.sections.push(section);
                    }
                }
            }
            ("Author", Some("AuthorList")) => {
                if let Some(name) = self.author.take().and_then(|a| a.name()) {
                    self.authors.push(name);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        if within(path, "ArticleTitle") {
            self.title.push_str(text);
            return;
        }
        if within(path, "VernacularTitle") {
            self.vernacular_title.push_str(text);
            return;
        }
        if within(path, "AbstractText") {
            if let Some(section) = self.section.as_mut() {
                section.push_str(text);
            }
            return;
        }

        let Some((leaf, rest)) = path.split_last() else {
            return;
        };
        match (leaf.as_str(), parent(rest)) {
            ("PMID", Some("MedlineCitation" | "BookDocument")) if self.pmid.is_none() => {
                self.pmid = Some(text.trim().to_string());
            }
            ("LastName", Some("Author")) => {
                if let Some(author) = self.author.as_mut() {
                    author.last_name.push_str(text);
                }
            }
            ("ForeName", Some("Author")) => {
                if let Some(author) = self.author.as_mut() {
                    author.fore_name.push_str(text);
                }
            }
            ("CollectiveName", Some("Author")) => {
                if let Some(author) = self.author.as_mut() {
                    author.collective_name.push_str(text);
                }
            }
            ("Title", Some("Journal")) => self.journal_title.push_str(text),
            ("ISOAbbreviation", Some("Journal")) => self.iso_abbreviation.push_str(text),
            ("BookTitle", Some("Book")) => self.book_title.push_str(text),
            ("Year", Some("PubDate")) => self.year.push_str(text),
            ("Month", Some("PubDate")) => self.month.push_str(text),
            ("Day", Some("PubDate")) => self.day.push_str(text),
            ("MedlineDate", Some("PubDate")) => self.medline_date.push_str(text),
            _ => {}
        }
    }

    fn finish(self) -> RawRecord {
        let title = non_blank(collapse_whitespace(&self.title))
            .or_else(|| non_blank(collapse_whitespace(&self.vernacular_title)));
        let abstract_text = non_blank(self.sections.join("\n"));
        let journal = non_blank(collapse_whitespace(&self.journal_title))
            .or_else(|| non_blank(collapse_whitespace(&self.iso_abbreviation)))
            .or_else(|| non_blank(collapse_whitespace(&self.book_title)));

        let pub_date = if self.year.trim().is_empty() {
            non_blank(collapse_whitespace(&self.medline_date))
        } else {
            non_blank(collapse_whitespace(&format!("{} {} {}", self.year, self.month, self.day)))
        };

        RawRecord {
            pmid: self.pmid.filter(|p| !p.is_empty()),
            title,
            abstract_text,
            authors: self.authors,
            journal,
            pub_date,
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
