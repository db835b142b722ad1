// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager: loads every perception model once at startup

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::detection::OnnxRegionDetector;
use super::face::OnnxFaceDetector;
use super::ocr::PaddleOcrEngine;
use super::qr::RqrrQrDecoder;
use crate::config::ExtractorConfig;
use crate::pipeline::Perception;

/// Information about a vision model, as reported by `/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisionModelInfo {
    pub name: String,
    pub model_type: String,
    pub available: bool,
}

/// Holds the loaded perception models
///
/// A model that fails to load is logged and left out; the manager still
/// builds so the server can report what is missing.
pub struct VisionModelManager {
    card_detector: Option<Arc<OnnxRegionDetector>>,
    face_detector: Option<Arc<OnnxFaceDetector>>,
    ocr_engine: Option<Arc<PaddleOcrEngine>>,
    qr_decoder: Arc<RqrrQrDecoder>,
}

impl VisionModelManager {
    pub fn load(config: &ExtractorConfig) -> Self {
        let models = &config.models;
        let thresholds = &config.thresholds;

        let card_detector = load_model("card detector", || {
            OnnxRegionDetector::new(
                &models.card_detector_path,
                thresholds.card_confidence,
                thresholds.card_iou,
            )
        });

        let face_detector = load_model("face detector", || {
            OnnxFaceDetector::new(
                &models.face_detector_path,
                thresholds.face_confidence,
                thresholds.min_face_size,
            )
        });

        let ocr_engine = load_model("PaddleOCR", || {
            PaddleOcrEngine::new(&models.ocr_model_dir)
                .map(|engine| engine.with_min_confidence(thresholds.ocr_min_confidence))
        });

        Self {
            card_detector,
            face_detector,
            ocr_engine,
            qr_decoder: Arc::new(RqrrQrDecoder::new()),
        }
    }

    /// The perception bundle, when every model is available
    pub fn perception(&self) -> Option<Perception> {
        Some(Perception {
            region_detector: self.card_detector.clone()?,
            ocr: self.ocr_engine.clone()?,
            qr: self.qr_decoder.clone(),
            face: self.face_detector.clone()?,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.card_detector.is_some() && self.face_detector.is_some() && self.ocr_engine.is_some()
    }

    /// List all vision models and whether they loaded
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            model_info("card-detector", "detection", self.card_detector.is_some()),
            model_info("face-detector", "detection", self.face_detector.is_some()),
            model_info("paddleocr", "ocr", self.ocr_engine.is_some()),
            model_info("qr", "decoder", true),
        ]
    }
}

fn load_model<T, F>(name: &str, load: F) -> Option<Arc<T>>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    let start = Instant::now();
    match load() {
        Ok(model) => {
            tracing::info!("✅ {} loaded in {}ms", name, start.elapsed().as_millis());
            Some(Arc::new(model))
        }
        Err(e) => {
            tracing::warn!("⚠️ Failed to load {}: {:#}", name, e);
            None
        }
    }
}

fn model_info(name: &str, model_type: &str, available: bool) -> VisionModelInfo {
    VisionModelInfo {
        name: name.to_string(),
        model_type: model_type.to_string(),
        available,
    }
}
