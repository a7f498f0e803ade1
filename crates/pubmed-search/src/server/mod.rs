//! HTTP server for the search function.
//!
//! [`dispatch`] holds the request handling; [`transport`] binds it to axum.

pub mod dispatch;
pub mod transport;

use std::net::SocketAddr;

use crate::pipeline::SearchPipeline;

pub use dispatch::{HttpRequest, HttpResponse, cors_headers, dispatch};

/// Search function server.
#[derive(Debug)]
pub struct SearchServer {
    pipeline: SearchPipeline,
}

impl SearchServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(pipeline: SearchPipeline) -> Self {
        Self { pipeline }
    }

    /// Run the server until CTRL+C.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        tracing::info!("Starting search server on port {}", port);

        let router = transport::create_router(self.pipeline);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
