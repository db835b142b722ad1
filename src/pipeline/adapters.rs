// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Perception adapter contracts
//!
//! Each collaborator (card detector, OCR engine, QR decoder, face detector)
//! sits behind a `Send + Sync` trait taking an already-decoded image. Model
//! backed implementations live in `crate::vision`; tests substitute fakes.
//!
//! Adapters return empty/absent results for images that decode but contain
//! nothing useful. `Err` is reserved for genuine inference failures and is
//! reported by the engine as `InternalError`.

use image::DynamicImage;
use std::sync::Arc;

use super::error::PerceptionError;

/// Axis-aligned box in source image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A scored box from the region detector
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: usize,
}

/// One recognized piece of text, in reading order
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    /// Index of the text line the token was read from (top to bottom)
    pub line: usize,
    pub confidence: f32,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            line,
            confidence: 1.0,
        }
    }

    /// Build a token sequence with one token per line, e.g. for fixtures
    pub fn sequence<S: AsRef<str>>(texts: &[S]) -> Vec<OcrToken> {
        texts
            .iter()
            .enumerate()
            .map(|(line, text)| OcrToken::new(text.as_ref(), line))
            .collect()
    }
}

/// String decoded from the QR code on the back of the card
pub type QrPayload = String;

/// Face presence on the front image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceSignal {
    pub present: bool,
    /// Number of faces that passed the detector thresholds
    pub faces: usize,
}

impl FaceSignal {
    pub fn present(faces: usize) -> Self {
        Self {
            present: faces > 0,
            faces,
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

/// Locates the card in a photograph
pub trait RegionDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, PerceptionError>;
}

/// Reads text from an image region, returning tokens in reading order
pub trait OcrEngine: Send + Sync {
    fn read(&self, image: &DynamicImage) -> Result<Vec<OcrToken>, PerceptionError>;
}

/// Decodes the first readable QR code in an image
pub trait QrDecoder: Send + Sync {
    fn decode(&self, image: &DynamicImage) -> Result<Option<QrPayload>, PerceptionError>;
}

/// Reports whether a face is visible in an image
pub trait FaceDetector: Send + Sync {
    fn detect_face(&self, image: &DynamicImage) -> Result<FaceSignal, PerceptionError>;
}

/// The four perception collaborators handed to the engine
///
/// Each handle is constructed once at startup and shared read-only across
/// requests.
#[derive(Clone)]
pub struct Perception {
    pub region_detector: Arc<dyn RegionDetector>,
    pub ocr: Arc<dyn OcrEngine>,
    pub qr: Arc<dyn QrDecoder>,
    pub face: Arc<dyn FaceDetector>,
}

impl std::fmt::Debug for Perception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Perception").finish_non_exhaustive()
    }
}

/// Pick the card region: the highest-confidence detection at or above `threshold`
///
/// Degenerate (zero-area) boxes are never selected.
pub fn select_card_region(detections: &[RawDetection], threshold: f32) -> Option<&RawDetection> {
    detections
        .iter()
        .filter(|d| d.confidence >= threshold && !d.bbox.is_empty())
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
