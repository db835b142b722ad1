// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model-backed perception adapters
//!
//! This module provides:
//! - Card region and face detection via YOLOv8 (ONNX Runtime)
//! - Text reading via PaddleOCR
//! - QR decoding via rqrr
//!
//! All models run on CPU.

pub mod detection;
pub mod face;
pub mod image_utils;
pub mod model_manager;
pub mod ocr;
pub mod onnx;
pub mod qr;

pub use detection::{OnnxRegionDetector, YoloDetector};
pub use face::OnnxFaceDetector;
pub use image_utils::{
    crop_region, decode_base64_bytes, decode_image_bytes_with_limit, sniff_format, ImageError,
    ImageInfo, MAX_IMAGE_SIZE,
};
pub use model_manager::{VisionModelInfo, VisionModelManager};
pub use ocr::PaddleOcrEngine;
pub use qr::RqrrQrDecoder;
