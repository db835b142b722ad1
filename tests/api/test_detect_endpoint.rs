// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::fakes::{back_png, front_png, Scenario, CNIC};
use cnic_extractor::api::{create_router, AppState};
use cnic_extractor::pipeline::ReconciliationEngine;
use cnic_extractor::vision::MAX_IMAGE_SIZE;

const BOUNDARY: &str = "cnic-test-boundary";

fn router(engine: Option<Arc<ReconciliationEngine>>) -> Router {
    create_router(AppState::new(
        engine,
        Vec::new(),
        Duration::from_secs(30),
        MAX_IMAGE_SIZE,
    ))
}

fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}.png\"\r\n",
                name, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(parts: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/detect/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn json_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/cnic")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_detect_accepts_valid_card() {
    let app = router(Some(Scenario::valid().engine()));
    let (front, back) = (front_png(), back_png());

    let (status, body) = send(
        app,
        multipart_request(&[("front_image", front.as_slice()), ("back_image", back.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["card_info"]["Id Card Number"], CNIC);
    assert_eq!(body["data"]["front_cnic"], CNIC);
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn test_detect_missing_back_is_bad_request() {
    let app = router(Some(Scenario::valid().engine()));
    let front = front_png();

    let (status, body) = send(app, multipart_request(&[("front_image", front.as_slice())])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"], json!(["UnreadableImage"]));
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_detect_ignores_unknown_fields() {
    let app = router(Some(Scenario::valid().engine()));
    let (front, back) = (front_png(), back_png());

    let (status, _) = send(
        app,
        multipart_request(&[
            ("note", b"hello".as_slice()),
            ("front_image", front.as_slice()),
            ("back_image", back.as_slice()),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_detect_undecodable_image() {
    let app = router(Some(Scenario::valid().engine()));
    let front = front_png();

    let (status, body) = send(
        app,
        multipart_request(&[("front_image", front.as_slice()), ("back_image", b"not a png".as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["UnreadableImage"]));
}

#[tokio::test]
async fn test_detect_no_face() {
    let app = router(Some(Scenario::valid().no_face().engine()));
    let (front, back) = (front_png(), back_png());

    let (status, body) = send(
        app,
        multipart_request(&[("front_image", front.as_slice()), ("back_image", back.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"], json!(["NoFaceDetected"]));
}

#[tokio::test]
async fn test_detect_cnic_mismatch() {
    let app = router(Some(
        Scenario::valid().qr(Some("3520199999999")).engine(),
    ));
    let (front, back) = (front_png(), back_png());

    let (status, body) = send(
        app,
        multipart_request(&[("front_image", front.as_slice()), ("back_image", back.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["errors"], json!(["CnicMismatch"]));
}

#[tokio::test]
async fn test_detect_without_models_is_internal_error() {
    let app = router(None);
    let (front, back) = (front_png(), back_png());

    let (status, body) = send(
        app,
        multipart_request(&[("front_image", front.as_slice()), ("back_image", back.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errors"], json!(["InternalError"]));
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_json_accepts_valid_card() {
    let app = router(Some(Scenario::valid().engine()));

    let (status, body) = send(
        app,
        json_request(json!({
            "frontImage": STANDARD.encode(front_png()),
            "backImage": STANDARD.encode(back_png()),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["card_info"]["Name"], "MUHAMMAD ALI");
}

#[tokio::test]
async fn test_json_accepts_data_url() {
    let app = router(Some(Scenario::valid().engine()));

    let (status, _) = send(
        app,
        json_request(json!({
            "frontImage": format!("data:image/png;base64,{}", STANDARD.encode(front_png())),
            "backImage": STANDARD.encode(back_png()),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_json_missing_front() {
    let app = router(Some(Scenario::valid().engine()));

    let (status, body) = send(
        app,
        json_request(json!({ "backImage": STANDARD.encode(back_png()) })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["UnreadableImage"]));
}

#[tokio::test]
async fn test_json_invalid_base64() {
    let app = router(Some(Scenario::valid().engine()));

    let (status, body) = send(
        app,
        json_request(json!({
            "frontImage": "!!!not-base64!!!",
            "backImage": STANDARD.encode(back_png()),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_json_malformed_body() {
    let app = router(Some(Scenario::valid().engine()));

    let request = Request::builder()
        .method("POST")
        .uri("/v1/cnic")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["UnreadableImage"]));
}
