//! Error types for the PubMed search function.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

use axum::http::{Method, StatusCode};

/// Errors from the E-utilities client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Malformed EFetch XML
    #[error("Failed to parse XML: {0}")]
    Xml(String),

    /// E-utilities reported an error inside a successful response
    #[error("PubMed error: {message}")]
    Upstream {
        /// Error message from E-utilities
        message: String,
    },

    /// Rate limited by NCBI (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Create an upstream protocol error.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream { message: message.into() }
    }

    /// Classify a non-success upstream status.
    #[must_use]
    pub fn from_status(status: u16, retry_after: Option<u64>, message: impl Into<String>) -> Self {
        match status {
            429 => Self::rate_limited(retry_after.unwrap_or(1)),
            400 => Self::bad_request(message),
            500..=599 => Self::server(status, message),
            _ => Self::UnexpectedStatus { status, message: message.into() },
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_) | Self::Server { .. })
    }
}

impl From<quick_xml::Error> for ClientError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// A fetched record that could not be turned into a paper.
///
/// Never surfaced to callers; the record is skipped.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    /// Record carries no PMID
    #[error("record has no PMID")]
    MissingPmid,
}

/// Errors surfaced to the HTTP caller.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// Request body is not a valid search request
    #[error("Invalid request body: {0}")]
    RequestParse(#[from] serde_json::Error),

    /// Request body could not be read within the size limit
    #[error("Request body exceeds {limit} bytes")]
    RequestTooLarge {
        /// Maximum accepted body size
        limit: usize,
    },

    /// ESearch failed
    #[error("PubMed search failed: {source}")]
    UpstreamSearch {
        /// Query sent upstream
        query: String,
        /// Underlying client error
        source: ClientError,
    },

    /// EFetch failed
    #[error("PubMed fetch failed: {source}")]
    UpstreamFetch {
        /// Identifiers requested
        ids: Vec<String>,
        /// Underlying client error
        source: ClientError,
    },

    /// Method other than POST or OPTIONS
    #[error("Method {0} not allowed")]
    UnsupportedMethod(Method),
}

impl HandlerError {
    /// HTTP status for the error envelope.
    ///
    /// Pipeline failures, including unparseable bodies, all map to 500.
    /// Oversized bodies map to 413.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RequestTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to the message placed in the error envelope.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::UpstreamSearch { source: ClientError::RateLimited { retry_after }, .. }
            | Self::UpstreamFetch { source: ClientError::RateLimited { retry_after }, .. } => {
                format!("Rate limited by PubMed. Please wait {:?} before retrying.", retry_after)
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;
