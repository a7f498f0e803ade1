//! JSON response shapes for ESearch and ELink.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ESearchResponse {
    #[serde(default)]
    pub esearchresult: Option<ESearchData>,
    /// Top-level error, e.g. "API rate limit exceeded".
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ESearchData {
    #[serde(default)]
    pub idlist: Vec<String>,
    #[serde(rename = "ERROR", default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ELinkResponse {
    #[serde(default)]
    pub linksets: Vec<LinkSet>,
    #[serde(rename = "ERROR", default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkSet {
    #[serde(default)]
    pub linksetdbs: Vec<LinkSetDb>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkSetDb {
    #[serde(default)]
    pub linkname: String,
    #[serde(default)]
    pub links: Vec<serde_json::Value>,
}

impl ELinkResponse {
    /// Number of links under `linkname` in the first link set.
    pub fn link_count(&self, linkname: &str) -> usize {
        self.linksets
            .first()
            .and_then(|set| set.linksetdbs.iter().find(|db| db.linkname == linkname))
            .map_or(0, |db| db.links.len())
    }
}
