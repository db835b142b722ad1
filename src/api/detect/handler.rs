// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Card extraction handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::{response::IntoResponse, Json};
use axum_extra::extract::multipart::MultipartRejection;
use axum_extra::extract::Multipart;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::request::{read_card_upload, CardImagesRequest, CardUpload};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::pipeline::ExtractionResponse;

/// POST /api/detect/ - Extract and cross-check a card from two uploads
///
/// # Request
/// Multipart form with `front_image` and `back_image` file fields.
///
/// # Response
/// The extraction envelope. Status follows the outcome:
/// - 200: card accepted
/// - 400 `UnreadableImage`: missing or undecodable image
/// - 422 `NoFaceDetected`: no portrait on the front
/// - 406 `CnicMismatch`: front and back numbers disagree
/// - 500 `InternalError`: models unavailable, timeout, or adapter failure
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("Rejected detect upload: {}", rejection);
            return ApiError::InvalidUpload(rejection.body_text()).into_response();
        }
    };

    match read_card_upload(&mut multipart).await {
        Ok(upload) => run_extraction(&state, upload).await.into_response(),
        Err(e) => {
            warn!("Rejected detect upload: {}", e);
            e.into_response()
        }
    }
}

/// POST /v1/cnic - Same as `/api/detect/` with base64 images in JSON
///
/// # Request
/// - `frontImage`: Base64-encoded front image (required)
/// - `backImage`: Base64-encoded back image (required)
pub async fn detect_json_handler(
    State(state): State<AppState>,
    request: Result<Json<CardImagesRequest>, JsonRejection>,
) -> Response {
    let upload = request
        .map_err(|rejection| ApiError::InvalidUpload(rejection.body_text()))
        .and_then(|Json(request)| request.into_upload(state.max_image_bytes));

    match upload {
        Ok(upload) => run_extraction(&state, upload).await.into_response(),
        Err(e) => {
            warn!("Rejected CNIC request: {}", e);
            e.into_response()
        }
    }
}

/// Run the engine off the async runtime, bounded by the request timeout
pub async fn run_extraction(state: &AppState, upload: CardUpload) -> ExtractionResponse {
    let Some(engine) = state.engine.clone() else {
        warn!("Extraction requested but perception models are not loaded");
        return ApiError::ServiceUnavailable("perception models not loaded".to_string())
            .to_response();
    };

    debug!(
        "Running extraction ({} front bytes, {} back bytes)",
        upload.front.len(),
        upload.back.len()
    );

    let mut task = tokio::task::spawn_blocking(move || engine.process(&upload.front, &upload.back));

    match tokio::time::timeout(state.request_timeout, &mut task).await {
        Ok(Ok(response)) => response,
        Ok(Err(join_error)) => {
            error!("Extraction task failed: {}", join_error);
            ApiError::TaskFailed(join_error.to_string()).to_response()
        }
        Err(_) => {
            let secs = state.request_timeout.as_secs();
            error!("Extraction exceeded {}s timeout", secs);
            // Blocking work cannot be cancelled; inference runs on and its result is dropped
            watch_abandoned(task, state.request_timeout);
            ApiError::Timeout(secs).to_response()
        }
    }
}

/// Log when a timed-out blocking task finally finishes
///
/// The returned handle resolves to the extra time the task ran past the
/// deadline, or `None` if it failed.
pub fn watch_abandoned<T: Send + 'static>(
    task: JoinHandle<T>,
    deadline: Duration,
) -> JoinHandle<Option<Duration>> {
    let abandoned_at = Instant::now();
    tokio::spawn(async move {
        match task.await {
            Ok(_) => {
                let overrun = abandoned_at.elapsed();
                warn!(
                    "Abandoned extraction finished {}ms after its {}s deadline, result discarded",
                    overrun.as_millis(),
                    deadline.as_secs()
                );
                Some(overrun)
            }
            Err(join_error) => {
                warn!("Abandoned extraction failed: {}", join_error);
                None
            }
        }
    })
}
