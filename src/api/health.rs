// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GET /health

use axum::{extract::State, Json};
use serde::Serialize;

use super::http_server::AppState;
use crate::version::VERSION_NUMBER;

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub name: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "ok" when the engine is ready, "degraded" otherwise
    pub status: String,
    pub models: Vec<ModelStatus>,
    pub version: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.engine.is_some() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        models: state
            .models
            .iter()
            .map(|m| ModelStatus {
                name: m.name.clone(),
                available: m.available,
            })
            .collect(),
        version: VERSION_NUMBER.to_string(),
    })
}
