//! Error types for provisioning API client operations

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Client error type wrapping all possible error conditions
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ClientError {
    /// HTTP transport error
    #[error("HTTP transport error: {0}")]
    Transport(
        #[from]
        #[diagnostic_source]
        TransportError,
    ),

    /// Request serialization failed
    #[error("{0}")]
    Encode(
        #[from]
        #[diagnostic_source]
        EncodeError,
    ),

    /// Response deserialization failed
    #[error("{0}")]
    Decode(
        #[from]
        #[diagnostic_source]
        DecodeError,
    ),

    /// HTTP error response without an `errorMessage` body
    #[error("HTTP {0}")]
    Http(
        #[from]
        #[diagnostic_source]
        HttpError,
    ),

    /// The server answered with an `errorMessage` body
    #[error("{0}")]
    Remote(
        #[from]
        #[diagnostic_source]
        RemoteError,
    ),
}

impl ClientError {
    /// The remote error, if the server reported one.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(remote) => Some(remote),
            _ => None,
        }
    }
}

/// Transport-level errors that occur during HTTP communication
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TransportError {
    /// Failed to establish connection to server
    #[error("Connection error: {0}")]
    Connect(String),

    /// Request timed out
    #[error("Request timeout")]
    Timeout,

    /// Request construction failed (malformed URI, headers, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other transport error
    #[error("Transport error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Turn an [`HttpClient`](crate::http_client::HttpClient) error into a
    /// transport error.
    ///
    /// Clients that already report a `TransportError` keep their
    /// classification; anything else becomes [`TransportError::Other`].
    pub fn from_client_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(error);
        match boxed.downcast::<TransportError>() {
            Ok(transport) => *transport,
            Err(other) => Self::Other(other),
        }
    }
}

/// Error type for encoding request bodies
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum EncodeError {
    /// Failed to serialize JSON body
    #[error("Failed to serialize JSON: {0}")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

/// Response deserialization errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DecodeError {
    /// JSON deserialization failed
    #[error("Failed to deserialize JSON: {0}")]
    #[diagnostic(
        code(provisioner::decode::json),
        help("the server answered with a body that matches neither the output nor the errorMessage envelope")
    )]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

/// HTTP error response (non-2xx status codes with no `errorMessage` body)
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct HttpError {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Response body if available
    pub body: Option<Bytes>,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(body) = &self.body {
            if let Ok(s) = std::str::from_utf8(body) {
                write!(f, ":\n{}", s)?;
            }
        }
        Ok(())
    }
}

/// Error reported by the provisioning server through the `errorMessage` field.
///
/// The server signals failures in the body, not the status line, so this can
/// arrive with any HTTP status including 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error, miette::Diagnostic)]
#[error("server error: {error_message}")]
#[diagnostic(code(provisioner::remote))]
pub struct RemoteError {
    /// Message as sent by the server
    #[serde(rename = "errorMessage")]
    pub error_message: String,
    /// HTTP status the message arrived with
    #[serde(skip, default = "default_status")]
    pub status: http::StatusCode,
}

fn default_status() -> http::StatusCode {
    http::StatusCode::OK
}

impl RemoteError {
    /// Build a remote error from a message and status
    pub fn new(error_message: impl Into<String>, status: http::StatusCode) -> Self {
        Self {
            error_message: error_message.into(),
            status,
        }
    }

    /// The message as sent by the server
    pub fn message(&self) -> &str {
        &self.error_message
    }
}

/// Result type for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(feature = "reqwest-client")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() || e.is_request() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Other(Box::new(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("socket closed")]
    struct Closed;

    #[test]
    fn transport_errors_keep_their_classification() {
        assert!(matches!(
            TransportError::from_client_error(TransportError::Timeout),
            TransportError::Timeout
        ));
        match TransportError::from_client_error(Closed) {
            TransportError::Other(e) => assert_eq!(e.to_string(), "socket closed"),
            other => panic!("expected other, got {other:?}"),
        }
    }

    #[cfg(feature = "reqwest-client")]
    #[tokio::test]
    async fn reqwest_failures_are_classified() {
        use crate::http_client::HttpClient;

        // relative URIs are rejected while building the request
        let request = http::Request::post("/rest/config").body(Vec::new()).unwrap();
        let err = reqwest::Client::new().send_http(request).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)), "{err:?}");

        let err = TransportError::from_client_error(err);
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }
}
