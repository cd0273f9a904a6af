//! Router construction and the serve loop.

use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::handlers;
use crate::pipeline::extract::{OcrTextExtractor, TextExtractor};
use crate::pipeline::llm::{CompletionClient, OpenAiChatClient};
use crate::pipeline::store::UploadStore;
use crate::report::ReportPipeline;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared by every request. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub pipeline: Arc<ReportPipeline>,
}

impl AppState {
    /// State with explicit extractor and completion client.
    pub fn new(
        config: ServiceConfig,
        extractor: Arc<dyn TextExtractor>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        let pipeline = ReportPipeline::new(
            UploadStore::from_config(&config),
            extractor,
            client,
            config.max_document_chars,
        );
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }

    /// State with the production backends: pdfium + tesseract, OpenAI API.
    pub fn from_config(config: ServiceConfig) -> Result<Self, AppError> {
        let extractor = Arc::new(OcrTextExtractor::from_config(&config));
        let client = Arc::new(OpenAiChatClient::from_config(&config)?);
        Ok(Self::new(config, extractor, client))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index).post(handlers::submit))
        .route("/download", get(handlers::download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), AppError> {
    state.pipeline.store.ensure_dir().await?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Internal(format!("binding {}: {}", addr, e)))?;
    info!(
        "Listening on http://{} (storage: {})",
        addr,
        state.pipeline.store.dir().display()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("server error: {}", e)))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
