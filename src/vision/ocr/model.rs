// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR engine combining text detection and recognition

use anyhow::Result;
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use super::detection::OcrDetectionModel;
use super::preprocessing::{detection_input, recognition_input};
use super::recognition::OcrRecognitionModel;
use crate::pipeline::{BoundingBox, OcrEngine, OcrToken, PerceptionError};
use crate::vision::image_utils::crop_region;

/// Detection model file inside the OCR model directory
pub const DETECTION_MODEL_FILE: &str = "det_model.onnx";
/// Recognition model file inside the OCR model directory
pub const RECOGNITION_MODEL_FILE: &str = "rec_model.onnx";
/// Character dictionary inside the OCR model directory
pub const DICTIONARY_FILE: &str = "ppocr_keys_v1.txt";

/// Default minimum recognition confidence for a token to be kept
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

/// A recognized region before line assignment
#[derive(Debug, Clone)]
pub struct TextRegion {
    pub text: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// PaddleOCR pipeline: detect text boxes, crop, recognize, order
///
/// Both sessions are shared and serialized by their own mutex.
#[derive(Debug, Clone)]
pub struct PaddleOcrEngine {
    detection: OcrDetectionModel,
    recognition: OcrRecognitionModel,
    min_confidence: f32,
}

impl PaddleOcrEngine {
    /// Load the models from `model_dir`
    ///
    /// Expected files:
    /// - det_model.onnx (text detection)
    /// - rec_model.onnx (text recognition)
    /// - ppocr_keys_v1.txt (character dictionary)
    pub fn new<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        info!("Loading PaddleOCR models from {}", model_dir.display());

        let detection = OcrDetectionModel::new(model_dir.join(DETECTION_MODEL_FILE))?;
        let recognition = OcrRecognitionModel::new(
            model_dir.join(RECOGNITION_MODEL_FILE),
            model_dir.join(DICTIONARY_FILE),
        )?;

        Ok(Self {
            detection,
            recognition,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        })
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    /// Detect and recognize every text region, in detection order
    pub fn recognize_regions(&self, image: &DynamicImage) -> Result<Vec<TextRegion>, PerceptionError> {
        let (tensor, letterbox) = detection_input(image);
        let boxes = self.detection.detect(tensor)?;

        let mut regions = Vec::with_capacity(boxes.len());
        for span in boxes.iter().filter(|b| b.is_usable()) {
            let Some(bbox) =
                letterbox.to_source_box(span.x, span.y, span.width, span.height)
            else {
                continue;
            };
            let Some(crop) = crop_region(image, &bbox) else {
                continue;
            };

            let recognized = self.recognition.recognize(recognition_input(&crop))?;
            if recognized.is_blank() || recognized.confidence < self.min_confidence {
                debug!(
                    "Dropping OCR region {:?} ({:?}, confidence {:.2})",
                    bbox, recognized.text, recognized.confidence
                );
                continue;
            }

            regions.push(TextRegion {
                text: recognized.text,
                confidence: recognized.confidence,
                bounding_box: bbox,
            });
        }

        Ok(regions)
    }
}

impl OcrEngine for PaddleOcrEngine {
    fn read(&self, image: &DynamicImage) -> Result<Vec<OcrToken>, PerceptionError> {
        let start = Instant::now();
        let regions = self.recognize_regions(image)?;
        debug!(
            "PaddleOCR read {} regions in {}ms",
            regions.len(),
            start.elapsed().as_millis()
        );
        Ok(into_reading_order(regions))
    }
}

/// Group regions into text lines and emit tokens top to bottom, left to right
///
/// A region joins a line when its vertical center falls inside the line's
/// first region.
pub fn into_reading_order(mut regions: Vec<TextRegion>) -> Vec<OcrToken> {
    regions.sort_by_key(|r| (r.bounding_box.y, r.bounding_box.x));

    let mut lines: Vec<(BoundingBox, Vec<TextRegion>)> = Vec::new();
    for region in regions {
        let center = region.bounding_box.y as u64 * 2 + region.bounding_box.height as u64;
        let line = lines.iter_mut().find(|(anchor, _)| {
            let top = anchor.y as u64 * 2;
            let bottom = (anchor.y as u64 + anchor.height as u64) * 2;
            center >= top && center <= bottom
        });

        match line {
            Some((_, members)) => members.push(region),
            None => lines.push((region.bounding_box, vec![region])),
        }
    }

    lines
        .into_iter()
        .enumerate()
        .flat_map(|(line, (_, mut members))| {
            members.sort_by_key(|r| r.bounding_box.x);
            members.into_iter().map(move |r| OcrToken {
                text: r.text,
                line,
                confidence: r.confidence,
            })
        })
        .collect()
}
