// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection over ONNX Runtime
//!
//! Used for the card region detector and, with a face-trained model, the
//! face detector. The network input is the image stretched to a square
//! `YOLO_INPUT_SIZE` RGB tensor scaled to `[0, 1]`. The output is
//! `[1, 4 + num_classes, anchors]` with boxes as center x/y, width, height
//! in input pixels.

use anyhow::Result;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{Array4, ArrayViewD, Axis, Ix2};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::pipeline::{BoundingBox, PerceptionError, RawDetection, RegionDetector};
use crate::vision::onnx::OnnxSession;

/// Square input size of the YOLOv8 exports
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Default score threshold for card detections
pub const DEFAULT_CONFIDENCE: f32 = 0.2;

/// Default IoU threshold for non-maximum suppression
pub const DEFAULT_IOU: f32 = 0.3;

/// Stretch an image into the YOLO input tensor
///
/// Returns the tensor and the (x, y) factors mapping input pixels back to
/// the source image.
pub fn preprocess_for_yolo(image: &DynamicImage, input_size: u32) -> (Array4<f32>, (f32, f32)) {
    let (width, height) = image.dimensions();
    let resized = image
        .resize_exact(input_size, input_size, FilterType::Triangle)
        .to_rgb8();

    let size = input_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    let scale = (
        width as f32 / input_size as f32,
        height as f32 / input_size as f32,
    );
    (tensor, scale)
}

/// Decode raw YOLOv8 output into scored boxes in source image pixels
///
/// Boxes below `confidence` are dropped and the rest pass through
/// per-class non-maximum suppression. Output is sorted by confidence,
/// highest first.
pub fn decode_yolo_output(
    output: ArrayViewD<f32>,
    confidence: f32,
    iou_threshold: f32,
    scale: (f32, f32),
    image_size: (u32, u32),
) -> Result<Vec<RawDetection>, String> {
    let shape = output.shape().to_vec();
    let predictions = match shape.as_slice() {
        [1, rows, _] if *rows > 4 => output
            .index_axis_move(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|e| e.to_string())?,
        other => return Err(format!("unexpected YOLO output shape {:?}", other)),
    };

    let rows = predictions.shape()[0];
    let anchors = predictions.shape()[1];
    let (img_w, img_h) = (image_size.0 as f32, image_size.1 as f32);

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let (class_id, score) = (4..rows)
            .map(|row| (row - 4, predictions[[row, anchor]]))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });

        if score < confidence {
            continue;
        }

        let cx = predictions[[0, anchor]] * scale.0;
        let cy = predictions[[1, anchor]] * scale.1;
        let w = predictions[[2, anchor]] * scale.0;
        let h = predictions[[3, anchor]] * scale.1;

        let x0 = (cx - w / 2.0).clamp(0.0, img_w);
        let y0 = (cy - h / 2.0).clamp(0.0, img_h);
        let x1 = (cx + w / 2.0).clamp(0.0, img_w);
        let y1 = (cy + h / 2.0).clamp(0.0, img_h);

        let bbox = BoundingBox {
            x: x0.round() as u32,
            y: y0.round() as u32,
            width: (x1 - x0).round() as u32,
            height: (y1 - y0).round() as u32,
        };
        if bbox.is_empty() {
            continue;
        }

        candidates.push(RawDetection {
            bbox,
            confidence: score,
            class_id,
        });
    }

    Ok(non_max_suppression(candidates, iou_threshold))
}

/// Per-class greedy NMS, highest confidence first
pub fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for detection in detections {
        let suppressed = kept.iter().any(|k| {
            k.class_id == detection.class_id && iou(&k.bbox, &detection.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(detection);
        }
    }
    kept
}

/// Intersection over union of two boxes
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);

    if x1 <= x0 || y1 <= y0 {
        return 0.0;
    }

    let intersection = (x1 - x0) as u64 * (y1 - y0) as u64;
    let union = a.area() + b.area() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

/// A YOLOv8 ONNX model with its thresholds
#[derive(Debug, Clone)]
pub struct YoloDetector {
    session: OnnxSession,
    confidence: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn new<P: AsRef<Path>>(model_path: P, label: &'static str) -> Result<Self> {
        Ok(Self {
            session: OnnxSession::load(model_path, label, 4)?,
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU,
        })
    }

    pub fn with_thresholds(mut self, confidence: f32, iou_threshold: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self.iou_threshold = iou_threshold.clamp(0.0, 1.0);
        self
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Run the detector on a decoded image
    pub fn run(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, PerceptionError> {
        let start = Instant::now();
        let (tensor, scale) = preprocess_for_yolo(image, YOLO_INPUT_SIZE);
        let output = self.session.run(tensor)?;

        let detections = decode_yolo_output(
            output.view(),
            self.confidence,
            self.iou_threshold,
            scale,
            image.dimensions(),
        )
        .map_err(|reason| PerceptionError::InvalidOutput {
            model: self.session.label(),
            reason,
        })?;

        debug!(
            "{} produced {} detections in {}ms",
            self.session.label(),
            detections.len(),
            start.elapsed().as_millis()
        );
        Ok(detections)
    }
}

/// Card region detector backed by the YOLOv8 card model
#[derive(Debug, Clone)]
pub struct OnnxRegionDetector {
    detector: YoloDetector,
}

impl OnnxRegionDetector {
    pub fn new<P: AsRef<Path>>(model_path: P, confidence: f32, iou_threshold: f32) -> Result<Self> {
        Ok(Self {
            detector: YoloDetector::new(model_path, "card-detector")?
                .with_thresholds(confidence, iou_threshold),
        })
    }
}

impl RegionDetector for OnnxRegionDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, PerceptionError> {
        self.detector.run(image)
    }
}
