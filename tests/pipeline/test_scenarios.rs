// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::fakes::{back_png, front_png, Scenario, CNIC};
use cnic_extractor::pipeline::PipelineError;

#[test]
fn test_valid_card_is_accepted() {
    let engine = Scenario::valid().engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(response.success);
    assert_eq!(response.status_code(), 200);
    assert!(response.errors.is_empty());

    let record = response.data.expect("accepted card carries a record");
    assert_eq!(record.card_info.name.as_deref(), Some("MUHAMMAD ALI"));
    assert_eq!(record.card_info.guardian_name.as_deref(), Some("AHMED ALI"));
    assert_eq!(record.card_info.id_card_number.as_deref(), Some(CNIC));
    assert_eq!(record.card_info.date_of_birth.as_deref(), Some("010190"));
    assert_eq!(record.card_info.date_of_issue.as_deref(), Some("010120"));
    assert_eq!(record.card_info.date_of_expiry.as_deref(), Some("010130"));
    assert_eq!(record.front_cnic.as_deref(), Some(CNIC));
    assert_eq!(record.back_cnic.as_deref(), Some(CNIC));
    assert_eq!(record.ocr_upper_raw.len(), 3);
    assert_eq!(record.ocr_lower_raw.len(), 4);
}

#[test]
fn test_accepted_envelope_json_shape() {
    let engine = Scenario::valid().engine();

    let json = serde_json::to_value(engine.process(&front_png(), &back_png())).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["card_info"]["Name"], "MUHAMMAD ALI");
    assert_eq!(json["data"]["card_info"]["Id Card Number"], CNIC);
    assert_eq!(json["errors"], serde_json::json!([]));
}

#[test]
fn test_missing_face_is_rejected() {
    let engine = Scenario::valid().no_face().engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(!response.success);
    assert_eq!(response.errors, vec!["NoFaceDetected"]);
    assert_eq!(response.status_code(), 422);
    assert!(response.data.is_none());
}

#[test]
fn test_face_check_precedes_cnic_check() {
    let engine = Scenario::valid()
        .no_face()
        .qr(Some("3520199999999"))
        .engine();

    let response = engine.process(&front_png(), &back_png());
    assert_eq!(response.errors, vec!["NoFaceDetected"]);
}

#[test]
fn test_mismatched_qr_is_rejected() {
    let engine = Scenario::valid().qr(Some("3520199999999")).engine();

    let err = engine.extract(&front_png(), &back_png()).unwrap_err();
    match err {
        PipelineError::CnicMismatch { front, back } => {
            assert_eq!(front.as_deref(), Some(CNIC));
            assert_eq!(back.as_deref(), Some("3520199999999"));
        }
        other => panic!("expected CnicMismatch, got {:?}", other),
    }
}

#[test]
fn test_mismatch_status() {
    let engine = Scenario::valid().qr(Some("3520199999999")).engine();

    let response = engine.process(&front_png(), &back_png());
    assert_eq!(response.errors, vec!["CnicMismatch"]);
    assert_eq!(response.status_code(), 406);
}

#[test]
fn test_qr_takes_precedence_over_back_ocr() {
    // Back OCR misreads the number, the QR carries the right one
    let engine = Scenario::valid()
        .back(&["3520100000000", "01.01.1990", "01.01.2020", "01.01.2030"])
        .engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(response.success, "{:?}", response);
    assert_eq!(response.data.unwrap().back_cnic.as_deref(), Some(CNIC));
}

#[test]
fn test_back_ocr_used_without_qr() {
    let engine = Scenario::valid().qr(None).engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(response.success);
    assert_eq!(response.data.unwrap().back_cnic.as_deref(), Some(CNIC));
}

#[test]
fn test_unparseable_qr_falls_back_to_ocr() {
    let engine = Scenario::valid().qr(Some("https://example.invalid/card")).engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(response.success);
}

#[test]
fn test_structured_qr_payload() {
    // The CNIC sits at characters 12..25 of the issuer's payload
    let engine = Scenario::valid().qr(Some("PAKNADRA0001352011234567100")).engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(response.success, "{:?}", response);
}

#[test]
fn test_no_back_cnic_is_mismatch() {
    let engine = Scenario::valid()
        .qr(None)
        .back(&["01.01.1990", "01.01.2020", "01.01.2030"])
        .engine();

    let response = engine.process(&front_png(), &back_png());
    assert_eq!(response.errors, vec!["CnicMismatch"]);
}

#[test]
fn test_no_front_cnic_is_mismatch() {
    let engine = Scenario::valid().front(&["MUHAMMAD ALI", "AHMED ALI"]).engine();

    let response = engine.process(&front_png(), &back_png());
    assert_eq!(response.errors, vec!["CnicMismatch"]);
}

#[test]
fn test_hyphenated_front_cnic_matches() {
    let engine = Scenario::valid()
        .front(&["MUHAMMAD ALI", "AHMED ALI", "35201-1234567-1"])
        .engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(response.success);
    assert_eq!(
        response.data.unwrap().card_info.id_card_number.as_deref(),
        Some(CNIC)
    );
}

#[test]
fn test_missing_dates_are_null() {
    let engine = Scenario::valid().back(&["3520112345671"]).engine();

    let response = engine.process(&front_png(), &back_png());
    assert!(response.success);
    let info = response.data.unwrap().card_info;
    assert!(info.date_of_birth.is_none());
    assert!(info.date_of_expiry.is_none());
}

#[test]
fn test_back_cnic_differing_in_last_digit() {
    let back = ["3520112345679", "01.01.1990", "01.01.2020", "01.01.2030"];

    for qr in [None, Some("3520112345679")] {
        let engine = Scenario::valid().back(&back).qr(qr).engine();
        let response = engine.process(&front_png(), &back_png());
        assert!(!response.success);
        assert_eq!(response.errors, vec!["CnicMismatch"]);
        assert!(response.data.is_none());
    }
}
