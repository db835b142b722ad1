// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Face presence detection on the card front

use anyhow::Result;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use super::detection::{YoloDetector, DEFAULT_IOU};
use crate::pipeline::{FaceDetector, FaceSignal, PerceptionError, RawDetection};

/// Default face score threshold
pub const DEFAULT_FACE_CONFIDENCE: f32 = 0.5;

/// Faces smaller than this on either side (pixels) are ignored
pub const DEFAULT_MIN_FACE_SIZE: u32 = 40;

/// Face detector backed by a YOLOv8 face model
#[derive(Debug, Clone)]
pub struct OnnxFaceDetector {
    detector: YoloDetector,
    min_face_size: u32,
}

impl OnnxFaceDetector {
    pub fn new<P: AsRef<Path>>(model_path: P, confidence: f32, min_face_size: u32) -> Result<Self> {
        Ok(Self {
            detector: YoloDetector::new(model_path, "face-detector")?
                .with_thresholds(confidence, DEFAULT_IOU),
            min_face_size,
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect_face(&self, image: &DynamicImage) -> Result<FaceSignal, PerceptionError> {
        let detections = self.detector.run(image)?;
        let faces = count_faces(&detections, self.min_face_size);
        debug!(
            "{} face candidates, {} at least {}px",
            detections.len(),
            faces,
            self.min_face_size
        );
        Ok(FaceSignal::present(faces))
    }
}

/// Count detections large enough to be a portrait
pub fn count_faces(detections: &[RawDetection], min_face_size: u32) -> usize {
    detections
        .iter()
        .filter(|d| d.bbox.width >= min_face_size && d.bbox.height >= min_face_size)
        .count()
}
