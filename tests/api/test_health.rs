// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

use crate::fakes::Scenario;
use cnic_extractor::api::{create_router, AppState};
use cnic_extractor::vision::{VisionModelInfo, MAX_IMAGE_SIZE};

fn models(available: bool) -> Vec<VisionModelInfo> {
    vec![
        VisionModelInfo {
            name: "card-detector".to_string(),
            model_type: "detection".to_string(),
            available,
        },
        VisionModelInfo {
            name: "qr".to_string(),
            model_type: "decoder".to_string(),
            available: true,
        },
    ]
}

fn health(state: AppState) -> (StatusCode, Value) {
    tokio_test::block_on(async move {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    })
}

#[test]
fn test_health_ok_when_engine_loaded() {
    let state = AppState::new(
        Some(Scenario::valid().engine()),
        models(true),
        Duration::from_secs(30),
        MAX_IMAGE_SIZE,
    );

    let (status, body) = health(state);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["models"][0]["name"], "card-detector");
    assert_eq!(body["models"][0]["available"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_health_degraded_without_engine() {
    let state = AppState::new(None, models(false), Duration::from_secs(30), MAX_IMAGE_SIZE);

    let (status, body) = health(state);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["models"][0]["available"], false);
    assert_eq!(body["models"][1]["available"], true);
}
