// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR integration for reading card text
//!
//! Components:
//! - `detection` - Text region detection (DB probability map)
//! - `recognition` - CTC text recognition on cropped lines
//! - `preprocessing` - Letterboxing and normalization for both models
//! - `model` - Combined OCR engine with reading-order output

pub mod detection;
pub mod model;
pub mod preprocessing;
pub mod recognition;

pub use detection::{OcrDetectionModel, TextSpan};
pub use model::{into_reading_order, PaddleOcrEngine, TextRegion};
pub use recognition::{CharacterSet, LineReading, OcrRecognitionModel};
