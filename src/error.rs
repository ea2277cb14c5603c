//! Error types for the Orderly client library.

use thiserror::Error;

/// The main error type for all Orderly client operations.
#[derive(Error, Debug)]
pub enum OrderlyError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Orderly API returned an error
    #[error("Orderly API error: {0}")]
    Api(ApiError),

    /// The server rejected a WebSocket control request (subscribe, request, auth)
    #[error("server rejected {event} request: {message}")]
    AckFailure {
        /// The event marker of the rejected request
        event: String,
        /// The server's error message, if it sent one
        message: String,
    },

    /// No queue is registered for the topic
    #[error("no queue registered for topic: {topic}")]
    UnknownTopic {
        /// The topic name that was looked up
        topic: String,
    },

    /// The WebSocket manager has no live connection
    #[error("WebSocket manager is not connected")]
    NotConnected,

    /// The WebSocket manager was stopped while the call was waiting
    #[error("WebSocket manager stopped")]
    Stopped,

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing required credentials
    #[error("Missing credentials: account id, key and secret required for private endpoints")]
    MissingCredentials,
}

/// An error returned by the Orderly API in a response body.
///
/// Error bodies have the shape `{"success": false, "code": -1001, "message": "..."}`
/// and arrive with a non-2xx HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code of the response
    pub status: u16,
    /// The numeric error code from Orderly (e.g., -1001)
    pub code: i64,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (HTTP {})", self.code, self.message, self.status)
    }
}

impl ApiError {
    /// Create a new API error from status, code and message.
    pub fn new(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limit(&self) -> bool {
        self.status == 429
    }

    /// Check if this is an authentication/authorization failure.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}
