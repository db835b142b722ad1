// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text recognition
//!
//! Reads one cropped text line. The model emits a class distribution per
//! timestep which is greedily CTC-decoded against the character set.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayView2, ArrayViewD, Axis, Ix2};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::preprocessing::REC_INPUT_HEIGHT;
use crate::pipeline::PerceptionError;
use crate::vision::onnx::OnnxSession;

/// Text read from one line
#[derive(Debug, Clone, PartialEq)]
pub struct LineReading {
    pub text: String,
    /// Mean probability of the emitted characters, 0 when nothing was emitted
    pub confidence: f32,
}

impl LineReading {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Recognizer output classes: CTC blank at 0, then one class per dictionary line
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterSet {
    classes: Vec<char>,
}

impl CharacterSet {
    const BLANK: usize = 0;

    /// Parse a PaddleOCR key file, one character per line
    ///
    /// Blank lines are skipped. PaddleOCR models carry a trailing space class,
    /// appended here when the file lacks one.
    pub fn parse(keys: &str) -> Self {
        let mut classes = vec!['\0'];
        classes.extend(keys.lines().filter_map(|line| line.chars().next()));
        if !classes[1..].contains(&' ') {
            classes.push(' ');
        }
        Self { classes }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let keys = std::fs::read_to_string(path)
            .with_context(|| format!("OCR character dictionary not found: {}", path.display()))?;
        Ok(Self::parse(&keys))
    }

    /// Number of model output classes, blank included
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.len() <= 1
    }

    fn char_at(&self, class: usize) -> Option<char> {
        (class != Self::BLANK).then(|| self.classes.get(class).copied()).flatten()
    }

    /// Greedy CTC decoding over a `[1, T, C]` or `[T, C]` output
    pub fn decode(&self, output: ArrayViewD<f32>) -> Result<LineReading, String> {
        let steps = match output.ndim() {
            3 if output.shape()[0] == 1 => output.index_axis_move(Axis(0), 0),
            2 => output,
            _ => {
                return Err(format!(
                    "unexpected recognition output shape {:?}",
                    output.shape()
                ))
            }
        };
        let steps: ArrayView2<f32> = steps
            .into_dimensionality::<Ix2>()
            .map_err(|e| e.to_string())?;

        let mut text = String::new();
        let mut probability_sum = 0.0f32;
        let mut emitted = 0usize;
        let mut previous = Self::BLANK;

        for step in steps.outer_iter() {
            let (class, probability) = step
                .iter()
                .copied()
                .enumerate()
                .fold((Self::BLANK, f32::NEG_INFINITY), |best, (class, p)| {
                    if p > best.1 {
                        (class, p)
                    } else {
                        best
                    }
                });

            if class != previous {
                if let Some(ch) = self.char_at(class) {
                    text.push(ch);
                    probability_sum += probability;
                    emitted += 1;
                }
            }
            previous = class;
        }

        let confidence = match emitted {
            0 => 0.0,
            n => (probability_sum / n as f32).clamp(0.0, 1.0),
        };

        Ok(LineReading {
            text: text.trim().to_string(),
            confidence,
        })
    }
}

/// PaddleOCR text recognition model (CPU-only)
#[derive(Debug, Clone)]
pub struct OcrRecognitionModel {
    session: OnnxSession,
    charset: Arc<CharacterSet>,
}

impl OcrRecognitionModel {
    /// Load `rec_model.onnx` and its key file
    pub fn new(model_path: impl AsRef<Path>, keys_path: impl AsRef<Path>) -> Result<Self> {
        let charset = CharacterSet::from_file(keys_path.as_ref())?;
        info!("Loaded OCR character set with {} classes", charset.len());

        Ok(Self {
            session: OnnxSession::load(model_path, "ocr-recognition", 4)?,
            charset: Arc::new(charset),
        })
    }

    pub fn charset(&self) -> &CharacterSet {
        &self.charset
    }

    /// Read one line tensor built by `recognition_input`
    pub fn recognize(&self, input: Array4<f32>) -> Result<LineReading, PerceptionError> {
        let (batch, channels, height, width) = input.dim();
        if batch != 1 || channels != 3 || height != REC_INPUT_HEIGHT as usize || width < 4 {
            return Err(PerceptionError::Inference {
                model: self.session.label(),
                reason: format!(
                    "line tensor {:?} is not [1, 3, {}, W>=4]",
                    input.shape(),
                    REC_INPUT_HEIGHT
                ),
            });
        }

        let output = self.session.run(input)?;
        debug!("Recognition output shape: {:?}", output.shape());

        self.charset
            .decode(output.view())
            .map_err(|reason| PerceptionError::InvalidOutput {
                model: self.session.label(),
                reason,
            })
    }
}
