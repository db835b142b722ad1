// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Card record and response envelope types

use serde::{Deserialize, Serialize};

use super::error::PipelineError;

const SUCCESS_MESSAGE: &str = "ID card processed successfully";

/// The six labeled card fields
///
/// Absent values serialize as `null`; a field is never filled with a guess.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Guardian Name")]
    pub guardian_name: Option<String>,
    #[serde(rename = "Id Card Number")]
    pub id_card_number: Option<String>,
    #[serde(rename = "Date Of Birth")]
    pub date_of_birth: Option<String>,
    #[serde(rename = "Date Of Issue")]
    pub date_of_issue: Option<String>,
    #[serde(rename = "Date Of Expiry")]
    pub date_of_expiry: Option<String>,
}

/// Validated record returned on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub card_info: CardInfo,
    pub front_cnic: Option<String>,
    pub back_cnic: Option<String>,
    /// Front-side OCR tokens as read
    pub ocr_upper_raw: Vec<String>,
    /// Back-side OCR tokens as read
    pub ocr_lower_raw: Vec<String>,
}

/// Response envelope shared by every outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<CardRecord>,
    pub errors: Vec<String>,
}

impl ExtractionResponse {
    pub fn success(record: CardRecord) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(record),
            errors: Vec::new(),
        }
    }

    pub fn failure(err: &PipelineError) -> Self {
        Self {
            success: false,
            message: err.public_message(),
            data: None,
            errors: vec![err.code().to_string()],
        }
    }

    /// HTTP status for this envelope
    pub fn status_code(&self) -> u16 {
        if self.success {
            return 200;
        }
        match self.errors.first().map(String::as_str) {
            Some("UnreadableImage") => 400,
            Some("NoFaceDetected") => 422,
            Some("CnicMismatch") => 406,
            _ => 500,
        }
    }
}

impl From<Result<CardRecord, PipelineError>> for ExtractionResponse {
    fn from(result: Result<CardRecord, PipelineError>) -> Self {
        match result {
            Ok(record) => ExtractionResponse::success(record),
            Err(err) => ExtractionResponse::failure(&err),
        }
    }
}
