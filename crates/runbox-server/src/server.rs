use std::sync::Arc;

use axum::http::{header, Method};
use runbox_store::{BlobStore, FsBlobStore, InMemoryBlobStore};
use tokio::net::TcpListener;
use tower_http::cors::{self, CorsLayer};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Runbox storage server.
pub struct RunboxServer {
    config: ServerConfig,
}

impl RunboxServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the configured blob store and wrap it in handler state.
    pub async fn state(&self) -> ServerResult<AppState> {
        let blobs: Arc<dyn BlobStore> = match &self.config.data_dir {
            Some(dir) => Arc::new(FsBlobStore::open(dir).await?),
            None => Arc::new(InMemoryBlobStore::new()),
        };
        Ok(AppState::new(blobs, self.config.max_body_bytes))
    }

    /// Build the router (useful for testing).
    pub async fn router(&self) -> ServerResult<axum::Router> {
        let router = build_router(self.state().await?);
        if !self.config.cors {
            return Ok(router);
        }
        // browsers post JSON bodies, so the content-type header must be allowed
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_origin(cors::Any);
        Ok(router.layer(cors))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router().await?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        match &self.config.data_dir {
            Some(dir) => tracing::info!(data_dir = %dir.display(), "using filesystem blob store"),
            None => tracing::warn!("using in-memory blob store; records are lost on exit"),
        }
        tracing::info!("runbox server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
