// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::fakes::{back_png, front_png, Scenario};
use cnic_extractor::pipeline::{BoundingBox, PipelineError, Side};

#[test]
fn test_empty_front_is_unreadable() {
    let engine = Scenario::valid().engine();

    let err = engine.extract(&[], &back_png()).unwrap_err();
    match err {
        PipelineError::UnreadableImage { side, .. } => assert_eq!(side, Side::Front),
        other => panic!("expected UnreadableImage, got {:?}", other),
    }
}

#[test]
fn test_garbage_back_is_unreadable() {
    let engine = Scenario::valid().engine();

    let response = engine.process(&front_png(), b"definitely not an image");
    assert!(!response.success);
    assert_eq!(response.errors, vec!["UnreadableImage"]);
    assert_eq!(response.status_code(), 400);
    assert!(response.data.is_none());
}

#[test]
fn test_no_tokens_is_unreadable() {
    let engine = Scenario::valid().back(&[]).engine();

    let err = engine.extract(&front_png(), &back_png()).unwrap_err();
    match err {
        PipelineError::UnreadableImage { side, .. } => assert_eq!(side, Side::Back),
        other => panic!("expected UnreadableImage, got {:?}", other),
    }
}

#[test]
fn test_whitespace_tokens_are_unreadable() {
    let engine = Scenario::valid().front(&["   ", ""]).engine();

    let response = engine.process(&front_png(), &back_png());
    assert_eq!(response.errors, vec!["UnreadableImage"]);
}

#[test]
fn test_ocr_failure_is_internal() {
    let engine = Scenario::valid().failing_ocr().engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(!response.success);
    assert_eq!(response.errors, vec!["InternalError"]);
    assert_eq!(response.status_code(), 500);
    assert_eq!(response.message, "Internal server error");
}

#[test]
fn test_face_detector_failure_is_internal() {
    let engine = Scenario::valid().failing_face().engine();

    let response = engine.process(&front_png(), &back_png());
    assert_eq!(response.errors, vec!["InternalError"]);
}

#[test]
fn test_region_detector_failure_is_internal() {
    let engine = Scenario::valid().failing_detector().engine();

    let response = engine.process(&front_png(), &back_png());
    assert_eq!(response.errors, vec!["InternalError"]);
}

#[test]
fn test_crops_to_detected_card() {
    let bbox = BoundingBox {
        x: 20,
        y: 10,
        width: 200,
        height: 120,
    };
    let harness = Scenario::valid().card_at(bbox, 0.9).build();

    let response = harness.engine.process(&front_png(), &back_png());
    assert!(response.success, "{:?}", response);

    let seen = harness.ocr.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|dims| *dims == (200, 120)));

    // QR decoding always sees the full back frame
    assert_eq!(*harness.qr.seen.lock().unwrap(), vec![(320, 200)]);
}

#[test]
fn test_low_confidence_card_uses_full_frame() {
    let bbox = BoundingBox {
        x: 20,
        y: 10,
        width: 200,
        height: 120,
    };
    let harness = Scenario::valid().card_at(bbox, 0.05).build();

    let response = harness.engine.process(&front_png(), &back_png());
    assert!(response.success);

    let seen = harness.ocr.seen.lock().unwrap();
    assert!(seen.iter().all(|dims| *dims == (320, 200)));
}

#[test]
fn test_requests_do_not_share_state() {
    let engine = Scenario::valid().engine();

    let first = engine.process(&front_png(), &back_png());
    let rejected = engine.process(&[], &back_png());
    let second = engine.process(&front_png(), &back_png());

    assert!(first.success);
    assert!(!rejected.success);
    assert_eq!(first, second);
}
