// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-validation of a candidate card record
//!
//! Three checks run in a fixed order and the first failure wins:
//! readability, face presence, identity consistency.

use tracing::debug;

use super::adapters::{FaceSignal, OcrToken, QrPayload};
use super::error::{PipelineError, Side};
use super::parser::{match_qr_cnic, BackFields, FrontFields, PatternMatch};

/// Where the back-side comparison value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CnicSource {
    Qr,
    Ocr,
}

/// Everything read from the front image
#[derive(Debug, Clone)]
pub struct FrontReading {
    pub tokens: Vec<OcrToken>,
    pub fields: FrontFields,
    pub face: FaceSignal,
}

/// Everything read from the back image
#[derive(Debug, Clone)]
pub struct BackReading {
    pub tokens: Vec<OcrToken>,
    pub fields: BackFields,
    pub qr_payload: Option<QrPayload>,
}

/// Candidate record awaiting validation
#[derive(Debug, Clone)]
pub struct Candidate {
    pub front: FrontReading,
    pub back: BackReading,
}

/// A candidate that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub front_cnic: String,
    pub back_cnic: String,
    pub back_source: CnicSource,
}

/// Back-side CNIC: the QR value when it carries one, else the OCR token
pub fn resolve_back_cnic(
    qr_payload: Option<&str>,
    ocr_cnic: &PatternMatch<String>,
) -> Option<(String, CnicSource)> {
    if let Some(payload) = qr_payload {
        match match_qr_cnic(payload) {
            PatternMatch::Matched(cnic) => return Some((cnic, CnicSource::Qr)),
            other => debug!("QR payload carries no CNIC ({:?}), falling back to OCR", other),
        }
    }

    ocr_cnic
        .as_matched()
        .map(|cnic| (cnic.clone(), CnicSource::Ocr))
}

/// Decides whether a candidate record is acceptable
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossValidator;

impl CrossValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, candidate: &Candidate) -> Result<Verdict, PipelineError> {
        self.check_readability(candidate)?;
        self.check_face(&candidate.front.face)?;
        self.check_identity(candidate)
    }

    fn check_readability(&self, candidate: &Candidate) -> Result<(), PipelineError> {
        if !has_text(&candidate.front.tokens) {
            return Err(PipelineError::unreadable(
                Side::Front,
                "no text could be read from the image",
            ));
        }
        if !has_text(&candidate.back.tokens) {
            return Err(PipelineError::unreadable(
                Side::Back,
                "no text could be read from the image",
            ));
        }
        Ok(())
    }

    fn check_face(&self, face: &FaceSignal) -> Result<(), PipelineError> {
        if face.present {
            Ok(())
        } else {
            Err(PipelineError::NoFaceDetected)
        }
    }

    fn check_identity(&self, candidate: &Candidate) -> Result<Verdict, PipelineError> {
        let front = candidate.front.fields.cnic.as_matched().cloned();
        let back = resolve_back_cnic(
            candidate.back.qr_payload.as_deref(),
            &candidate.back.fields.cnic,
        );

        match (front, back) {
            (Some(front_cnic), Some((back_cnic, back_source))) if front_cnic == back_cnic => {
                Ok(Verdict {
                    front_cnic,
                    back_cnic,
                    back_source,
                })
            }
            (front, back) => Err(PipelineError::CnicMismatch {
                front,
                back: back.map(|(cnic, _)| cnic),
            }),
        }
    }
}

fn has_text(tokens: &[OcrToken]) -> bool {
    tokens.iter().any(|t| !t.text.trim().is_empty())
}
