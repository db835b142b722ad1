// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::detect::{detect_handler, detect_json_handler};
use super::health::health_handler;
use crate::pipeline::ReconciliationEngine;
use crate::vision::VisionModelInfo;

/// Multipart and JSON framing on top of the two images
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// `None` when the perception models failed to load
    pub engine: Option<Arc<ReconciliationEngine>>,
    pub models: Arc<Vec<VisionModelInfo>>,
    pub request_timeout: Duration,
    pub max_image_bytes: usize,
}

impl AppState {
    pub fn new(
        engine: Option<Arc<ReconciliationEngine>>,
        models: Vec<VisionModelInfo>,
        request_timeout: Duration,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            engine,
            models: Arc::new(models),
            request_timeout,
            max_image_bytes,
        }
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    // Base64 inflates by 4/3
    let body_limit = state.max_image_bytes * 2 * 4 / 3 + BODY_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_handler))
        // Multipart upload (front_image / back_image)
        .route("/api/detect/", post(detect_handler))
        // Base64 JSON variant
        .route("/v1/cnic", post(detect_json_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining requests");
}
