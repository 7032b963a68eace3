//! Job descriptor parsing and validation.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Label used in envelopes when a descriptor carries no usable operation.
pub const UNKNOWN_OPERATION: &str = "unknown";

/// Catalog operation requested by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Lend an item to a patron.
    Checkout,

    /// Take a lent item back.
    Return,

    /// Free-text catalog search.
    Search,
}

impl Operation {
    /// Every supported operation.
    pub const ALL: [Operation; 3] = [Operation::Checkout, Operation::Return, Operation::Search];

    /// Wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Checkout => "checkout",
            Operation::Return => "return",
            Operation::Search => "search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| DescriptorError::UnsupportedOperation(s.to_string()))
    }
}

/// Descriptor rejected at ingress.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("job descriptor is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("job descriptor must be a JSON object")]
    NotAnObject,

    #[error("job descriptor has no operation")]
    MissingOperation,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("malformed job descriptor: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("search query must be a string or a number, got {0}")]
    InvalidQuery(String),
}

/// A single requested catalog operation.
///
/// Owned by the caller and moved into the worker; nothing keeps it once the
/// envelope is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    /// Requested operation.
    pub operation: Operation,

    /// Operation-specific record (book identifiers, search query, ...).
    #[serde(default = "empty_record")]
    pub data_to_process: Value,

    /// Sealed credential token produced by the credential vault.
    pub encrypted_credentials: String,

    /// Free-form job parameters, passed through untouched.
    #[serde(default)]
    pub parameters: Map<String, Value>,

    /// Repository the job was published from (passthrough).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,

    /// Upstream data links (passthrough).
    #[serde(default)]
    pub data_source_links: Vec<Value>,

    /// Downstream data links (passthrough).
    #[serde(default)]
    pub data_sink_links: Vec<Value>,
}

fn empty_record() -> Value {
    Value::Object(Map::new())
}

impl JobDescriptor {
    /// Create a descriptor with empty passthrough fields.
    pub fn new(
        operation: Operation,
        data_to_process: Value,
        encrypted_credentials: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            data_to_process,
            encrypted_credentials: encrypted_credentials.into(),
            parameters: Map::new(),
            repository_url: None,
            data_source_links: Vec::new(),
            data_sink_links: Vec::new(),
        }
    }

    /// Validate a descriptor from an already-decoded JSON value.
    ///
    /// The operation is checked first so an unknown operation is reported
    /// as such rather than as a generic shape error. Search jobs must also
    /// carry a usable query.
    pub fn from_value(value: Value) -> Result<Self, DescriptorError> {
        let fields = value.as_object().ok_or(DescriptorError::NotAnObject)?;

        match fields.get("operation") {
            None | Some(Value::Null) => return Err(DescriptorError::MissingOperation),
            Some(Value::String(op)) => {
                op.parse::<Operation>()?;
            }
            Some(other) => return Err(DescriptorError::UnsupportedOperation(other.to_string())),
        }

        let job: Self = serde_json::from_value(value).map_err(DescriptorError::Malformed)?;
        if job.operation == Operation::Search {
            job.search_query()?;
        }

        Ok(job)
    }

    /// Search text carried in `dataToProcess.query`.
    ///
    /// Numbers are sent as their decimal text; a missing or null query
    /// searches for the empty string. Anything else is rejected.
    pub fn search_query(&self) -> Result<Cow<'_, str>, DescriptorError> {
        match self.data_to_process.get("query") {
            None | Some(Value::Null) => Ok(Cow::Borrowed("")),
            Some(Value::String(text)) => Ok(Cow::Borrowed(text)),
            Some(Value::Number(n)) => Ok(Cow::Owned(n.to_string())),
            Some(other) => Err(DescriptorError::InvalidQuery(other.to_string())),
        }
    }
}

/// Split raw job input into individual descriptors.
///
/// Accepts one object, an array of objects, or a stream of values separated
/// by whitespace (NDJSON included). If the text does not parse as a whole,
/// each non-blank line is parsed on its own, so a bad line yields one error
/// and the rest of the batch still runs.
pub fn read_batch(raw: &str) -> Vec<Result<Value, DescriptorError>> {
    let stream: Result<Vec<Value>, _> = serde_json::Deserializer::from_str(raw)
        .into_iter::<Value>()
        .collect();

    match stream {
        Ok(values) => values.into_iter().flat_map(split_array).map(Ok).collect(),
        Err(_) => raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .flat_map(|line| match serde_json::from_str(line) {
                Ok(value) => split_array(value).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(DescriptorError::InvalidJson(e))],
            })
            .collect(),
    }
}

fn split_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        single => vec![single],
    }
}

/// Operation label for a raw descriptor, used when it fails validation.
pub fn operation_label(value: &Value) -> String {
    value
        .get("operation")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_OPERATION)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "repositoryUrl": "https://github.com/library-system/main-function",
            "dataSourceLinks": [],
            "dataToProcess": { "query": "1984" },
            "dataSinkLinks": [],
            "encryptedCredentials": "AQID",
            "operation": "search",
            "parameters": {}
        })
    }

    #[test]
    fn test_parse_full_descriptor() {
        let job = JobDescriptor::from_value(sample()).unwrap();

        assert_eq!(job.operation, Operation::Search);
        assert_eq!(job.encrypted_credentials, "AQID");
        assert_eq!(job.search_query().unwrap(), "1984");
        assert_eq!(
            job.repository_url.as_deref(),
            Some("https://github.com/library-system/main-function")
        );
    }

    #[test]
    fn test_optional_fields_default() {
        let job =
            JobDescriptor::from_value(json!({"operation": "checkout", "encryptedCredentials": "x"}))
                .unwrap();

        assert_eq!(job.operation, Operation::Checkout);
        assert_eq!(job.data_to_process, json!({}));
        assert!(job.parameters.is_empty());
        assert!(job.data_source_links.is_empty());
        assert_eq!(job.search_query().unwrap(), "");
    }

    #[test]
    fn test_numeric_query_sent_as_text() {
        let mut raw = sample();
        raw["dataToProcess"] = json!({"query": 1984});

        let job = JobDescriptor::from_value(raw).unwrap();
        assert_eq!(job.search_query().unwrap(), "1984");

        let mut raw = sample();
        raw["dataToProcess"] = json!({"query": null});
        assert_eq!(JobDescriptor::from_value(raw).unwrap().search_query().unwrap(), "");
    }

    #[test]
    fn test_unusable_query_rejected() {
        for query in [json!(["1984"]), json!(true), json!({"title": "1984"})] {
            let mut raw = sample();
            raw["dataToProcess"] = json!({ "query": query.clone() });

            let err = JobDescriptor::from_value(raw).unwrap_err();
            assert!(matches!(err, DescriptorError::InvalidQuery(_)), "query {}", query);
        }

        // Only search jobs read the query.
        let mut raw = sample();
        raw["operation"] = json!("checkout");
        raw["dataToProcess"] = json!({"query": [1]});
        assert!(JobDescriptor::from_value(raw).is_ok());
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let mut raw = sample();
        raw["operation"] = json!("renew");

        let err = JobDescriptor::from_value(raw).unwrap_err();
        assert!(matches!(err, DescriptorError::UnsupportedOperation(ref op) if op == "renew"));
        assert_eq!(err.to_string(), "Unsupported operation: renew");
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut raw = sample();
        raw.as_object_mut().unwrap().remove("encryptedCredentials");
        assert!(matches!(
            JobDescriptor::from_value(raw),
            Err(DescriptorError::Malformed(_))
        ));

        let mut raw = sample();
        raw.as_object_mut().unwrap().remove("operation");
        assert!(matches!(
            JobDescriptor::from_value(raw),
            Err(DescriptorError::MissingOperation)
        ));

        assert!(matches!(
            JobDescriptor::from_value(json!(["search"])),
            Err(DescriptorError::NotAnObject)
        ));
    }

    #[test]
    fn test_read_batch_single_and_array() {
        let single = read_batch(&sample().to_string());
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].as_ref().unwrap()["operation"], "search");

        let pretty = serde_json::to_string_pretty(&json!([sample(), sample()])).unwrap();
        let batch = read_batch(&pretty);
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(Result::is_ok));

        assert!(read_batch("  \n").is_empty());
    }

    #[test]
    fn test_read_batch_keeps_going_past_bad_line() {
        let raw = format!("{}\n{{not json\n\n{}\n", sample(), sample());
        let batch = read_batch(&raw);

        assert_eq!(batch.len(), 3);
        assert!(batch[0].is_ok());
        assert!(matches!(batch[1], Err(DescriptorError::InvalidJson(_))));
        assert!(batch[2].is_ok());
    }

    #[test]
    fn test_operation_names() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
            assert_eq!(serde_json::to_value(op).unwrap(), json!(op.as_str()));
        }
        assert!("Search".parse::<Operation>().is_err());
    }

    #[test]
    fn test_operation_label() {
        assert_eq!(operation_label(&json!({"operation": "renew"})), "renew");
        assert_eq!(operation_label(&json!({"operation": 7})), UNKNOWN_OPERATION);
        assert_eq!(operation_label(&json!(null)), UNKNOWN_OPERATION);
    }
}
