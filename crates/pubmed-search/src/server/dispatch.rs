//! Request dispatch for the search function.
//!
//! [`dispatch`] is framework-independent: it takes a tagged [`HttpRequest`]
//! and always produces an [`HttpResponse`] carrying the CORS headers, so the
//! same code serves preflight, success and failure.

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::HandlerError;
use crate::models::{ErrorResponse, SearchRequest, SearchResponse};
use crate::pipeline::{SearchPipeline, Stage};

/// Headers a browser client may send.
pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Methods the function answers.
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Largest request body read before answering 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// An incoming request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
    /// Raw body.
    pub body: Bytes,
}

impl HttpRequest {
    /// Create a request with no headers.
    #[must_use]
    pub fn new(method: Method, body: impl Into<Bytes>) -> Self {
        Self { method, headers: HeaderMap::new(), body: body.into() }
    }

    /// Create a POST request with a body.
    #[must_use]
    pub fn post(body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, body)
    }

    /// Create a preflight request.
    #[must_use]
    pub fn options() -> Self {
        Self::new(Method::OPTIONS, Bytes::new())
    }
}

/// A response ready to be written.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers, CORS included.
    pub headers: HeaderMap,
    /// Serialized JSON body, empty for 204.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Empty preflight response.
    #[must_use]
    pub fn no_content() -> Self {
        let mut headers = cors_headers();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        Self { status: StatusCode::NO_CONTENT, headers, body: Vec::new() }
    }

    /// JSON response with the given status.
    #[must_use]
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(body) => Self { status, headers: cors_headers(), body },
            Err(e) => {
                error!(error = %e, "Failed to serialize response body");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    headers: cors_headers(),
                    body: br#"{"error":"Failed to serialize response","papers":[]}"#.to_vec(),
                }
            }
        }
    }

    /// Error envelope for a handler failure.
    #[must_use]
    pub fn error(err: &HandlerError) -> Self {
        let mut response = Self::json(err.status(), &ErrorResponse::new(err.to_user_message()));
        if matches!(err, HandlerError::UnsupportedMethod(_)) {
            response.headers.insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        response
    }

    /// Parse the body back into JSON.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Headers present on every response.
#[must_use]
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Route a request through the search function.
///
/// `OPTIONS` answers immediately, `POST` runs the pipeline, anything else
/// is rejected with 405.
pub async fn dispatch(pipeline: &SearchPipeline, request: HttpRequest) -> HttpResponse {
    debug!(stage = %Stage::AwaitingRequest, method = %request.method, "Dispatching request");

    match request.method.clone() {
        Method::OPTIONS => HttpResponse::no_content(),
        Method::POST => match handle_post(pipeline, &request).await {
            Ok(response) => {
                debug!(stage = %Stage::Responding, results = response.papers.len(), "Responding");
                HttpResponse::json(StatusCode::OK, &response)
            }
            Err(e) => {
                error!(stage = %Stage::Failed, error = %e, "Search request failed");
                HttpResponse::error(&e)
            }
        },
        other => {
            warn!(method = %other, "Unsupported method");
            HttpResponse::error(&HandlerError::UnsupportedMethod(other))
        }
    }
}

async fn handle_post(
    pipeline: &SearchPipeline,
    request: &HttpRequest,
) -> Result<SearchResponse, HandlerError> {
    debug!(
        stage = %Stage::ParsingBody,
        bytes = request.body.len(),
        content_type = ?request.headers.get(header::CONTENT_TYPE),
        "Parsing request body"
    );
    let search: SearchRequest = serde_json::from_slice(&request.body)?;
    pipeline.run(&search).await
}
