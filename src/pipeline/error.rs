// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the extraction pipeline
//!
//! Every failure below the reconciliation engine is converted into one of
//! four machine-readable codes before it leaves the engine:
//!
//! - **UnreadableImage**: input bytes missing, undecodable, or produced no OCR tokens
//! - **NoFaceDetected**: business-rule rejection, front image has no face
//! - **CnicMismatch**: business-rule rejection, front and back ID numbers disagree
//! - **InternalError**: an adapter or parsing step failed unexpectedly

use std::fmt;
use thiserror::Error;

/// Which side of the card an input or failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
        }
    }
}

/// Failure raised by a perception adapter (detector, OCR, QR, face)
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("{model} inference failed: {reason}")]
    Inference { model: &'static str, reason: String },

    #[error("{model} produced unexpected output: {reason}")]
    InvalidOutput { model: &'static str, reason: String },

    #[error("{0} session lock poisoned")]
    SessionPoisoned(&'static str),
}

/// Outcome codes of a failed extraction
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unable to read the {side} image: {reason}")]
    UnreadableImage { side: Side, reason: String },

    #[error("No face detected on the front image")]
    NoFaceDetected,

    #[error("Front and back CNIC numbers do not match")]
    CnicMismatch {
        front: Option<String>,
        back: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn unreadable(side: Side, reason: impl Into<String>) -> Self {
        PipelineError::UnreadableImage {
            side,
            reason: reason.into(),
        }
    }

    /// Machine-readable code reported in the envelope's `errors` list
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UnreadableImage { .. } => "UnreadableImage",
            PipelineError::NoFaceDetected => "NoFaceDetected",
            PipelineError::CnicMismatch { .. } => "CnicMismatch",
            PipelineError::Internal(_) => "InternalError",
        }
    }

    /// HTTP status the external layer maps this outcome to
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::UnreadableImage { .. } => 400,
            PipelineError::NoFaceDetected => 422,
            PipelineError::CnicMismatch { .. } => 406,
            PipelineError::Internal(_) => 500,
        }
    }

    /// Human-readable message for the envelope
    ///
    /// Internal failures are reported generically; details only go to the log.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<PerceptionError> for PipelineError {
    fn from(err: PerceptionError) -> Self {
        PipelineError::Internal(err.to_string())
    }
}
