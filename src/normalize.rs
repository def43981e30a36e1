//! Result Normalizer
//!
//! Maps raw Scopus entries onto the fixed `ResultRecord` schema. Upstream
//! schema drift never fails: every field goes through [`field`] and a missing
//! or odd-shaped value simply becomes `None`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::{RawEntry, RawResultSet};

pub const DOI_PREFIX: &str = "https://doi.org/";

const FIELD_IDENTIFIER: &str = "dc:identifier";
const FIELD_COVER_DATE: &str = "prism:coverDate";
const FIELD_CREATOR: &str = "dc:creator";
const FIELD_PUBLICATION: &str = "prism:publicationName";
const FIELD_TITLE: &str = "dc:title";
const FIELD_DOI: &str = "prism:doi";

/// One paper in the aggregated table, fields in export column order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultRecord {
    pub identifier: Option<String>,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub title: Option<String>,
    pub publication_date: Option<String>,
    pub publication_year: Option<i32>,
    pub doi_url: Option<String>,
    pub source_query: String,
}

/// Read a scalar field, defaulting to `None` for anything absent, null,
/// blank or structured.
pub fn field(entry: &RawEntry, name: &str) -> Option<String> {
    match entry.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Year of a cover date such as `2021-06-15`, `2021-06`, `2021` or an ISO
/// timestamp. Unparsable input gives `None`.
pub fn parse_year(date: &str) -> Option<i32> {
    let date = date.trim();
    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(d.year());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.year());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        return Some(dt.year());
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", date), "%Y-%m-%d") {
        return Some(d.year());
    }
    if date.len() == 4 && date.chars().all(|c| c.is_ascii_digit()) {
        return date.parse().ok();
    }
    None
}

pub fn doi_url(doi: Option<&str>) -> Option<String> {
    doi.map(|d| format!("{}{}", DOI_PREFIX, d.trim()))
}

/// Normalize one entry, stamping it with the query that produced it
pub fn normalize_entry(entry: &RawEntry, query: &str) -> ResultRecord {
    let publication_date = field(entry, FIELD_COVER_DATE);
    let doi = field(entry, FIELD_DOI);

    ResultRecord {
        identifier: field(entry, FIELD_IDENTIFIER),
        authors: field(entry, FIELD_CREATOR),
        journal: field(entry, FIELD_PUBLICATION),
        title: field(entry, FIELD_TITLE),
        publication_year: publication_date.as_deref().and_then(parse_year),
        publication_date,
        doi_url: doi_url(doi.as_deref()),
        source_query: query.to_string(),
    }
}

/// Normalize a whole result set. The empty-result sentinel yields no rows.
pub fn normalize(raw: &RawResultSet, query: &str) -> Vec<ResultRecord> {
    if raw.is_empty_result() {
        return Vec::new();
    }
    raw.entries.iter().map(|entry| normalize_entry(entry, query)).collect()
}
