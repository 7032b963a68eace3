//! Uniform result shape returned for every job.

use serde::Serialize;

use crate::auth::Role;
use crate::job::Operation;
use crate::worker::search::SearchResultRecord;

/// Prefix of the message produced by a successful search.
pub const SEARCH_MESSAGE_PREFIX: &str = "Search completed with results: ";

/// Overall outcome of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Failure,
}

/// Result envelope.
///
/// Failure envelopes only ever carry status, operation and message;
/// `results` is set for successful searches alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub status: EnvelopeStatus,

    /// Operation name as requested (raw text for rejected descriptors).
    pub operation: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SearchResultRecord>>,
}

impl ResultEnvelope {
    /// Successful envelope with a plain message.
    pub fn success(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            operation: operation.to_string(),
            message: message.into(),
            results: None,
        }
    }

    /// Successful search, with the results embedded in the message as JSON.
    pub fn search_success(results: Vec<SearchResultRecord>) -> Self {
        let listing = serde_json::to_string(&results).unwrap_or_else(|_| "[]".to_string());

        Self {
            status: EnvelopeStatus::Success,
            operation: Operation::Search.to_string(),
            message: format!("{}{}", SEARCH_MESSAGE_PREFIX, listing),
            results: Some(results),
        }
    }

    /// Failure envelope.
    pub fn failure(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Failure,
            operation: operation.into(),
            message: message.into(),
            results: None,
        }
    }

    /// Failure envelope for a role that may not run the operation.
    pub fn denied(operation: Operation, role: &Role) -> Self {
        Self::failure(
            operation.to_string(),
            format!("Operation not allowed for user type: {}", role),
        )
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }

    /// Compact JSON on a single line, as written to stdout.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
