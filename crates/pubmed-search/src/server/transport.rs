//! HTTP transport.
//!
//! Adapts axum requests into [`HttpRequest`] values and hands them to
//! [`dispatch`].

use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Method},
    response::IntoResponse,
    routing::{any, get},
};
use tower_http::trace::TraceLayer;

use super::dispatch::{HttpRequest, HttpResponse, MAX_BODY_BYTES, dispatch};
use crate::error::HandlerError;
use crate::pipeline::SearchPipeline;

/// Create the HTTP router for the search function.
pub fn create_router(pipeline: SearchPipeline) -> Router {
    Router::new()
        .route("/", any(handle_search))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(pipeline))
}

async fn health_check(State(pipeline): State<Arc<SearchPipeline>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pubmed-search",
        "version": env!("CARGO_PKG_VERSION"),
        "sortKey": pipeline.profile().sort_key,
        "maxResults": pipeline.profile().max_results
    }))
}

async fn handle_search(
    State(pipeline): State<Arc<SearchPipeline>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> HttpResponse {
    match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => dispatch(&pipeline, HttpRequest { method, headers, body }).await,
        Err(e) => {
            tracing::warn!(error = %e, limit = MAX_BODY_BYTES, "Rejecting request body");
            HttpResponse::error(&HandlerError::RequestTooLarge { limit: MAX_BODY_BYTES })
        }
    }
}
