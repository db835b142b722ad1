// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Reconciliation engine
//!
//! Runs the front and back side pipelines, hands the merged candidate to the
//! cross-validator, and classifies the outcome into a response envelope.
//! This is the only component that knows which image is the front and which
//! is the back.

use image::DynamicImage;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Span};
use uuid::Uuid;

use super::adapters::{select_card_region, OcrToken, Perception};
use super::error::{PerceptionError, PipelineError, Side};
use super::parser::{FieldMapper, ParseNote, PositionalMapper};
use super::record::{CardInfo, CardRecord, ExtractionResponse};
use super::validator::{BackReading, Candidate, CrossValidator, FrontReading, Verdict};
use crate::vision::image_utils::{crop_region, decode_image_bytes_with_limit, MAX_IMAGE_SIZE};

/// Tunables the engine reads per request
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum detector confidence for a card region to be accepted
    pub card_confidence: f32,
    /// Crop to the detected card before OCR (full frame when no card is found)
    pub crop_to_card: bool,
    /// Largest accepted upload, per image
    pub max_image_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            card_confidence: 0.2,
            crop_to_card: true,
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }
}

/// Orchestrates perception, parsing and validation for one card
pub struct ReconciliationEngine {
    perception: Perception,
    mapper: Arc<dyn FieldMapper>,
    validator: CrossValidator,
    config: PipelineConfig,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReconciliationEngine {
    pub fn new(perception: Perception, config: PipelineConfig) -> Self {
        Self {
            perception,
            mapper: Arc::new(PositionalMapper),
            validator: CrossValidator::new(),
            config,
        }
    }

    /// Replace the positional field mapper
    pub fn with_mapper(mut self, mapper: Arc<dyn FieldMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request end to end and wrap the outcome in the envelope
    pub fn process(&self, front: &[u8], back: &[u8]) -> ExtractionResponse {
        let request_id = Uuid::new_v4();
        let span = info_span!("cnic_extract", %request_id);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.extract(front, back);
        let elapsed_ms = start.elapsed().as_millis();

        match &result {
            Ok(record) => info!(
                "Card accepted in {}ms ({} front / {} back tokens)",
                elapsed_ms,
                record.ocr_upper_raw.len(),
                record.ocr_lower_raw.len()
            ),
            Err(PipelineError::Internal(detail)) => {
                error!("Extraction failed after {}ms: {}", elapsed_ms, detail)
            }
            Err(err) => warn!(
                "Card rejected after {}ms: {} ({})",
                elapsed_ms,
                err.code(),
                err
            ),
        }

        result.into()
    }

    /// Decode both images, read both sides, validate, and assemble the record
    pub fn extract(&self, front: &[u8], back: &[u8]) -> Result<CardRecord, PipelineError> {
        let front_image = decode_side(Side::Front, front, self.config.max_image_bytes)?;
        let back_image = decode_side(Side::Back, back, self.config.max_image_bytes)?;

        // The two sides share nothing, so they run side by side
        let (front, back) = thread::scope(|scope| {
            let front_span = Span::current();
            let back_span = Span::current();
            let front_image = &front_image;
            let back_image = &back_image;

            let front_task = scope.spawn(move || front_span.in_scope(|| self.read_front(front_image)));
            let back_task = scope.spawn(move || back_span.in_scope(|| self.read_back(back_image)));

            (
                front_task.join().unwrap_or_else(|_| Err(side_panicked(Side::Front))),
                back_task.join().unwrap_or_else(|_| Err(side_panicked(Side::Back))),
            )
        });

        let candidate = Candidate {
            front: front?,
            back: back?,
        };

        let verdict = self.validator.validate(&candidate)?;
        debug!(
            "CNIC cross-check passed: front={} back={} ({:?})",
            verdict.front_cnic, verdict.back_cnic, verdict.back_source
        );

        Ok(assemble(candidate, verdict))
    }

    fn read_front(&self, image: &DynamicImage) -> Result<FrontReading, PipelineError> {
        let tokens = self.read_text(Side::Front, image)?;
        let face = self.perception.face.detect_face(image)?;
        debug!("Front face signal: {:?}", face);

        let fields = self.mapper.map_front(&tokens);
        log_notes(Side::Front, &fields.notes);

        Ok(FrontReading {
            tokens,
            fields,
            face,
        })
    }

    fn read_back(&self, image: &DynamicImage) -> Result<BackReading, PipelineError> {
        let tokens = self.read_text(Side::Back, image)?;
        let qr_payload = self.perception.qr.decode(image)?;
        debug!("Back QR payload present: {}", qr_payload.is_some());

        let fields = self.mapper.map_back(&tokens);
        log_notes(Side::Back, &fields.notes);

        Ok(BackReading {
            tokens,
            fields,
            qr_payload,
        })
    }

    /// Detect the card, crop to it when found, and OCR the result
    fn read_text(&self, side: Side, image: &DynamicImage) -> Result<Vec<OcrToken>, PerceptionError> {
        let detections = self.perception.region_detector.detect(image)?;
        let region = select_card_region(&detections, self.config.card_confidence);

        let cropped = match region {
            Some(detection) if self.config.crop_to_card => {
                debug!(
                    "{} card region {:?} (confidence {:.2})",
                    side, detection.bbox, detection.confidence
                );
                crop_region(image, &detection.bbox)
            }
            _ => {
                debug!("{} card region not found, using full frame", side);
                None
            }
        };

        let tokens = self.perception.ocr.read(cropped.as_ref().unwrap_or(image))?;
        debug!("{} OCR produced {} tokens", side, tokens.len());
        Ok(tokens)
    }
}

fn decode_side(side: Side, bytes: &[u8], max_bytes: usize) -> Result<DynamicImage, PipelineError> {
    decode_image_bytes_with_limit(bytes, max_bytes)
        .map(|(image, info)| {
            debug!("Decoded {} image: {}x{} {:?}", side, info.width, info.height, info.format);
            image
        })
        .map_err(|e| PipelineError::unreadable(side, e.to_string()))
}

fn side_panicked(side: Side) -> PipelineError {
    PipelineError::Internal(format!("{} side pipeline panicked", side))
}

fn log_notes(side: Side, notes: &[ParseNote]) {
    for note in notes {
        debug!("{} {} candidate malformed: {:?}", side, note.field, note.raw);
    }
}

fn raw_texts(tokens: &[OcrToken]) -> Vec<String> {
    tokens.iter().map(|t| t.text.clone()).collect()
}

fn assemble(candidate: Candidate, verdict: Verdict) -> CardRecord {
    let Candidate { front, back } = candidate;

    CardRecord {
        card_info: CardInfo {
            name: front.fields.name,
            guardian_name: front.fields.guardian_name,
            id_card_number: Some(verdict.front_cnic.clone()),
            date_of_birth: back.fields.date_of_birth.map(|d| d.compact()),
            date_of_issue: back.fields.date_of_issue.map(|d| d.compact()),
            date_of_expiry: back.fields.date_of_expiry.map(|d| d.compact()),
        },
        front_cnic: Some(verdict.front_cnic),
        back_cnic: Some(verdict.back_cnic),
        ocr_upper_raw: raw_texts(&front.tokens),
        ocr_lower_raw: raw_texts(&back.tokens),
    }
}
