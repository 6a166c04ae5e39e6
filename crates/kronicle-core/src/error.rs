use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http_client::{HttpRequest, HttpResponse, TransportError};

/// Construction-time failures raised by payloads, identifiers, and sample types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid schema types {}; allowed: {}", format_pairs(.invalid), crate::domain::ColumnType::labels().join(", "))]
    InvalidSchemaTypes { invalid: Vec<(String, String)> },
    #[error("unknown column type '{value}'")]
    UnknownColumnType { value: String },

    #[error("sensor id must be a canonical UUID v4: '{value}'")]
    InvalidSensorId { value: String },
    #[error("sensor id missing")]
    MissingSensorId,

    #[error("timestamp must be ISO 8601: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("column lists have inconsistent lengths: {lengths:?}")]
    InconsistentColumnLengths { lengths: BTreeSet<usize> },
    #[error("failed to interpret 'time' column as datetime: {reason}")]
    InvalidTimeColumn { reason: String },

    #[error("field \"{field}\" has unsupported type for Kronicable: {description}")]
    UnsupportedFieldType { field: String, description: String },
    #[error("field '{field}' is required but has value None")]
    RequiredFieldMissing { field: String },
    #[error("field '{field}' is not declared on sample type '{sample}'")]
    UnknownField { field: String, sample: String },

    #[error("please provide a body for this request")]
    EmptyBody,
    #[error("invalid body type: expected a JSON object, got {found}")]
    InvalidBody { found: &'static str },

    #[error("unexpected data format '{value}', expected one of list, dict, df, str")]
    UnknownDataFormat { value: String },

    #[error("retry count must be greater than zero")]
    ZeroRetries,
    #[error("invalid value for {name}: '{value}'")]
    InvalidSetting { name: &'static str, value: String },

    #[error("malformed CSV at line {line}: {reason}")]
    MalformedCsv { line: usize, reason: String },
}

fn format_pairs(pairs: &[(String, String)]) -> String {
    let body = pairs
        .iter()
        .map(|(key, value)| format!("'{key}': '{value}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

/// Structured error body returned by the service for any status >= 400.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KronicleHttpError {
    pub status: u16,
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
    pub path: String,
    pub method: String,
    pub request_id: String,
}

impl KronicleHttpError {
    /// Builds the error model from a failed response.
    ///
    /// Bodies that do not decode to the structured model still yield an error
    /// carrying the status, reason phrase and raw text.
    pub fn from_response(request: &HttpRequest, response: &HttpResponse) -> Self {
        serde_json::from_str::<Self>(&response.body).unwrap_or_else(|_| Self {
            status: response.status,
            error: reqwest::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or("Unknown Status")
                .to_owned(),
            message: response.body.trim().to_owned(),
            details: None,
            path: request.url.clone(),
            method: request.method.as_str().to_owned(),
            request_id: String::new(),
        })
    }
}

impl Display for KronicleHttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {}\nfor request {} {}",
            self.status, self.error, self.message, self.method, self.path
        )
    }
}

impl std::error::Error for KronicleHttpError {}

/// Top-level error type for every SDK operation.
#[derive(Debug, Error)]
pub enum KronicleError {
    /// Every attempt failed at the transport level.
    #[error("failed to connect to {url} after {attempts} attempt(s)")]
    Connection {
        url: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The service was reachable but answered with something unusable.
    #[error("{message}")]
    Response { message: String },

    #[error(transparent)]
    Http(Box<KronicleHttpError>),

    /// Domain-level failure detected by a connector role.
    #[error("{message}")]
    Operation {
        message: String,
        payload: Option<Value>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KronicleError {
    pub fn response(message: impl Into<String>) -> Self {
        Self::Response {
            message: message.into(),
        }
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
            payload: None,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "kronicle.connection",
            Self::Response { .. } => "kronicle.response",
            Self::Http(_) => "kronicle.http",
            Self::Operation { .. } => "kronicle.operation",
            Self::Validation(_) => "kronicle.validation",
            Self::Serialization(_) => "kronicle.serialization",
            Self::Io(_) => "kronicle.io",
        }
    }

    /// Errors that reach the caller are final; transport retries happen
    /// inside the connector.
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// HTTP status carried by the error, if the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(error) => Some(error.status),
            _ => None,
        }
    }
}

impl From<KronicleHttpError> for KronicleError {
    fn from(value: KronicleHttpError) -> Self {
        Self::Http(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_every_offending_pair() {
        let error = ValidationError::InvalidSchemaTypes {
            invalid: vec![
                (String::from("temp"), String::from("unknown_type")),
                (String::from("flag"), String::from("boolean")),
            ],
        };
        let message = error.to_string();
        assert!(message.contains("'temp': 'unknown_type'"), "{message}");
        assert!(message.contains("'flag': 'boolean'"), "{message}");
        assert!(message.contains("datetime"), "{message}");
    }

    #[test]
    fn http_error_decodes_structured_body() {
        let request = HttpRequest::get("http://kronicle.test/data/v1/channels");
        let response = HttpResponse {
            status: 404,
            body: String::from(
                r#"{"status":404,"error":"Not Found","message":"no channel","path":"/data/v1/channels/x","method":"GET","request_id":"req-1"}"#,
            ),
        };

        let error = KronicleHttpError::from_response(&request, &response);
        assert_eq!(error.request_id, "req-1");
        assert_eq!(
            error.to_string(),
            "404 Not Found: no channel\nfor request GET /data/v1/channels/x"
        );
    }

    #[test]
    fn http_error_falls_back_on_unstructured_body() {
        let request = HttpRequest::get("http://kronicle.test/data/v1/channels");
        let response = HttpResponse {
            status: 502,
            body: String::from("<html>bad gateway</html>"),
        };

        let error = KronicleHttpError::from_response(&request, &response);
        assert_eq!(error.status, 502);
        assert_eq!(error.error, "Bad Gateway");
        assert_eq!(error.method, "GET");
        assert_eq!(error.path, "http://kronicle.test/data/v1/channels");
    }

    #[test]
    fn surfaced_errors_are_final() {
        let errors = [
            KronicleError::response("empty"),
            KronicleError::operation("nothing to delete"),
            KronicleError::from(ValidationError::EmptyBody),
        ];
        for error in errors {
            assert!(!error.is_retryable(), "{error}");
        }
    }
}
