//! Catalog search client for the Open Library search API.
//!
//! Issues one GET per query with an explicit field filter, then normalizes
//! each returned document into a [`SearchResultRecord`]. Every failure
//! (non-200, transport error, timeout, undecodable body) is recovered here
//! and reported as a failed [`SearchOutcome`]; nothing propagates.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{parse_search_url, ConfigError};

/// Fields requested from the search service.
pub const SEARCH_FIELDS: &str = "key,title,author_name,first_publish_year,cover_i";

/// Author used when a document lists none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Sentinel used when a document has no first publish year.
pub const YEAR_NOT_AVAILABLE: &str = "Not Available";

/// Message attached to every failed search.
pub const SEARCH_FAILURE_MESSAGE: &str = "Failed to fetch data from Open Library";

/// First publication year, or the "Not Available" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishYear {
    Known(i32),
    NotAvailable,
}

impl From<Option<i32>> for PublishYear {
    fn from(year: Option<i32>) -> Self {
        year.map_or(PublishYear::NotAvailable, PublishYear::Known)
    }
}

impl Serialize for PublishYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PublishYear::Known(year) => serializer.serialize_i32(*year),
            PublishYear::NotAvailable => serializer.serialize_str(YEAR_NOT_AVAILABLE),
        }
    }
}

/// One normalized catalog hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultRecord {
    pub title: String,

    /// First listed author, or "Unknown".
    pub author: String,

    pub year: PublishYear,

    /// Open Library cover identifier, serialized as null when missing.
    pub cover_id: Option<i64>,
}

/// Search status as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Success,
    Failure,
}

/// Normalized result of one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResultRecord>,
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchOutcome {
    fn success(results: Vec<SearchResultRecord>) -> Self {
        Self {
            results,
            status: SearchStatus::Success,
            message: None,
        }
    }

    fn failure() -> Self {
        Self {
            results: Vec::new(),
            status: SearchStatus::Failure,
            message: Some(SEARCH_FAILURE_MESSAGE.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SearchStatus::Success
    }
}

/// Why a search produced no results.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search service returned {0}")]
    Status(StatusCode),

    #[error("search request timed out")]
    Timeout,

    #[error("search request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("search response is not valid: {0}")]
    Decode(#[source] serde_json::Error),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else {
            SearchError::Transport(e)
        }
    }
}

/// Search API response body.
///
/// Documents stay untyped so one odd field only affects its own entry.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    docs: Vec<Value>,
}

/// Map one document to a record, substituting defaults for missing or
/// off-type fields. Documents without a string title are dropped.
fn record_from_doc(doc: &Value) -> Option<SearchResultRecord> {
    let title = doc.get("title")?.as_str()?.to_string();

    let author = doc
        .get("author_name")
        .and_then(Value::as_array)
        .and_then(|names| names.first())
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string();

    let year = doc
        .get("first_publish_year")
        .and_then(Value::as_i64)
        .and_then(|year| i32::try_from(year).ok());

    Some(SearchResultRecord {
        title,
        author,
        year: year.into(),
        cover_id: doc.get("cover_i").and_then(Value::as_i64),
    })
}

fn normalize(docs: &[Value]) -> Vec<SearchResultRecord> {
    let records: Vec<SearchResultRecord> = docs.iter().filter_map(record_from_doc).collect();

    if records.len() < docs.len() {
        debug!(skipped = docs.len() - records.len(), "Skipped search docs without a title");
    }

    records
}

/// HTTP client for the catalog search service.
#[derive(Debug, Clone)]
pub struct CatalogSearchClient {
    http: Client,
    endpoint: Url,
}

impl CatalogSearchClient {
    /// Create a client whose requests are bounded by `timeout`.
    pub fn new(search_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let endpoint = parse_search_url(search_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Search the catalog. Never fails; failures come back as a failed outcome.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        match self.fetch(query).await {
            Ok(results) => {
                info!(query = %query, count = results.len(), "Catalog search completed");
                SearchOutcome::success(results)
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Catalog search failed");
                SearchOutcome::failure()
            }
        }
    }

    /// Run the request and normalize the documents.
    pub async fn fetch(&self, query: &str) -> Result<Vec<SearchResultRecord>, SearchError> {
        debug!(url = %self.endpoint, query = %query, "Querying catalog search");

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("q", query), ("fields", SEARCH_FIELDS)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SearchError::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&body).map_err(SearchError::Decode)?;

        Ok(normalize(&parsed.docs))
    }
}
