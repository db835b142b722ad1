// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request-level failures raised before or around the engine

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

use crate::pipeline::{ExtractionResponse, PipelineError, Side};

#[derive(Debug, Clone)]
pub enum ApiError {
    /// A required image field was not sent
    MissingImage(Side),
    /// The multipart or JSON body could not be read
    InvalidUpload(String),
    /// Base64 text for one side did not decode
    InvalidImage { side: Side, reason: String },
    /// Perception models are not loaded
    ServiceUnavailable(String),
    /// The engine did not finish within the request timeout
    Timeout(u64),
    /// The blocking engine task failed to complete
    TaskFailed(String),
}

impl ApiError {
    /// The pipeline outcome this failure is reported as
    pub fn to_pipeline_error(&self) -> PipelineError {
        match self {
            ApiError::MissingImage(side) => {
                PipelineError::unreadable(*side, format!("{}_image is required", side))
            }
            ApiError::InvalidUpload(reason) => PipelineError::unreadable(Side::Front, reason.clone()),
            ApiError::InvalidImage { side, reason } => PipelineError::unreadable(*side, reason.clone()),
            ApiError::ServiceUnavailable(msg) => PipelineError::Internal(msg.clone()),
            ApiError::Timeout(secs) => {
                PipelineError::Internal(format!("extraction timed out after {}s", secs))
            }
            ApiError::TaskFailed(msg) => PipelineError::Internal(msg.clone()),
        }
    }

    /// Build the response envelope for this failure
    pub fn to_response(&self) -> ExtractionResponse {
        ExtractionResponse::failure(&self.to_pipeline_error())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingImage(side) => write!(f, "Missing {} image", side),
            ApiError::InvalidUpload(reason) => write!(f, "Invalid upload: {}", reason),
            ApiError::InvalidImage { side, reason } => {
                write!(f, "Invalid {} image: {}", side, reason)
            }
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::Timeout(secs) => write!(f, "Request timed out after {}s", secs),
            ApiError::TaskFailed(msg) => write!(f, "Extraction task failed: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ExtractionResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}
