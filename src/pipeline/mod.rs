// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CNIC extraction-and-reconciliation pipeline
//!
//! Components, leaf first:
//! - `adapters` - contracts for the perception collaborators
//! - `parser` - OCR tokens to labeled candidate fields
//! - `validator` - readability, face presence and CNIC cross-checks
//! - `engine` - per-request orchestration over front and back images
//! - `record` - the card record and response envelope

pub mod adapters;
pub mod engine;
pub mod error;
pub mod parser;
pub mod record;
pub mod validator;

pub use adapters::{
    select_card_region, BoundingBox, FaceDetector, FaceSignal, OcrEngine, OcrToken, Perception,
    QrDecoder, QrPayload, RawDetection, RegionDetector,
};
pub use engine::{PipelineConfig, ReconciliationEngine};
pub use error::{PerceptionError, PipelineError, Side};
pub use parser::{
    match_cnic, match_dates, match_qr_cnic, BackFields, CardDate, FieldMapper, FrontFields,
    PatternMatch, PositionalMapper,
};
pub use record::{CardInfo, CardRecord, ExtractionResponse};
pub use validator::{CnicSource, CrossValidator, Verdict};
