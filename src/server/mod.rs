//! HTTP Server Layer
//!
//! Builds the axum router and serves it. The OCR engine is injected as a
//! shared handle on application state so handlers never reach for process
//! globals and tests can substitute a mock recognizer.

pub mod error;
pub mod ocr_api;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::engine::TextRecognizer;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    /// OCR engine handle, constructed once at startup
    pub recognizer: Arc<dyn TextRecognizer>,
}

impl AppState {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }
}

/// Build the application router
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/ocr", post(ocr_api::extract_text))
        .route("/health", get(get_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthReport {
    pub status: String,
}

/// Handler for `GET /health`
pub async fn get_health() -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
    })
}

/// Bind and serve until the process is stopped
pub async fn start_server(addr: SocketAddr, app: Router) -> Result<()> {
    info!("snaptext HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
