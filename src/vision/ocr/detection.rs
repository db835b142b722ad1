// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text detection
//!
//! The detection model emits a probability map (`[1, 1, H, W]` or `[1, H, W]`)
//! where each cell is the likelihood of belonging to text. Text regions are
//! the 4-connected components above the binarization threshold.

use anyhow::Result;
use ndarray::{Array4, ArrayViewD, IxDyn};
use std::path::Path;
use tracing::debug;

use crate::pipeline::PerceptionError;
use crate::vision::onnx::OnnxSession;

/// Default binarization threshold for the probability map
pub const DEFAULT_BOX_THRESHOLD: f32 = 0.3;

/// Components with fewer cells than this are treated as noise
const MIN_REGION_CELLS: usize = 10;

/// A text span found by the detector, in detector input pixels
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Mean probability over the component
    pub confidence: f32,
}

impl TextSpan {
    /// Spans with no extent or no support are skipped before recognition
    pub fn is_usable(&self) -> bool {
        self.confidence > 0.0 && self.width.min(self.height) > 0.0
    }
}

/// PaddleOCR text detection model (CPU-only)
#[derive(Debug, Clone)]
pub struct OcrDetectionModel {
    session: OnnxSession,
    box_threshold: f32,
}

impl OcrDetectionModel {
    /// Load the detection model (det_model.onnx)
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Ok(Self {
            session: OnnxSession::load(model_path, "ocr-detection", 4)?,
            box_threshold: DEFAULT_BOX_THRESHOLD,
        })
    }

    /// Run text detection on a tensor from `detection_input`
    pub fn detect(&self, input: Array4<f32>) -> Result<Vec<TextSpan>, PerceptionError> {
        let shape = input.shape().to_vec();
        if shape[0] != 1 || shape[1] != 3 {
            return Err(PerceptionError::Inference {
                model: self.session.label(),
                reason: format!("invalid input shape {:?}, expected [1, 3, H, W]", shape),
            });
        }

        let output = self.session.run(input)?;
        debug!("Detection output shape: {:?}", output.shape());

        let spans =
            parse_probability_map(output.view(), shape[2], shape[3], self.box_threshold)
                .map_err(|reason| PerceptionError::InvalidOutput {
                    model: self.session.label(),
                    reason,
                })?;

        debug!("Detected {} text regions", spans.len());
        Ok(spans)
    }
}

/// Extract text boxes from a detection probability map
///
/// Boxes are scaled to the `input_height` x `input_width` tensor space and
/// sorted top to bottom, then left to right.
pub fn parse_probability_map(
    output: ArrayViewD<f32>,
    input_height: usize,
    input_width: usize,
    threshold: f32,
) -> Result<Vec<TextSpan>, String> {
    let map = ProbabilityMap::new(output)?;

    let scale_y = input_height as f32 / map.height as f32;
    let scale_x = input_width as f32 / map.width as f32;

    let mut visited = vec![vec![false; map.width]; map.height];
    let mut spans = Vec::new();

    for y in 0..map.height {
        for x in 0..map.width {
            if visited[y][x] || map.at(x, y) < threshold {
                continue;
            }

            let region = map.flood_fill(&mut visited, x, y, threshold);
            if region.count <= MIN_REGION_CELLS {
                continue;
            }

            spans.push(TextSpan {
                x: region.min_x as f32 * scale_x,
                y: region.min_y as f32 * scale_y,
                width: (region.max_x - region.min_x + 1) as f32 * scale_x,
                height: (region.max_y - region.min_y + 1) as f32 * scale_y,
                confidence: region.sum / region.count as f32,
            });
        }
    }

    spans.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    Ok(spans)
}

struct ProbabilityMap<'a> {
    data: ArrayViewD<'a, f32>,
    is_4d: bool,
    width: usize,
    height: usize,
}

struct Region {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
    count: usize,
    sum: f32,
}

impl<'a> ProbabilityMap<'a> {
    fn new(data: ArrayViewD<'a, f32>) -> Result<Self, String> {
        let shape = data.shape().to_vec();
        let (is_4d, height, width) = match shape.as_slice() {
            [1, 1, h, w] => (true, *h, *w),
            [1, h, w] => (false, *h, *w),
            other => return Err(format!("unexpected probability map shape {:?}", other)),
        };
        if height == 0 || width == 0 {
            return Err(format!("empty probability map {:?}", shape));
        }
        Ok(Self {
            data,
            is_4d,
            width,
            height,
        })
    }

    fn at(&self, x: usize, y: usize) -> f32 {
        if self.is_4d {
            self.data[IxDyn(&[0, 0, y, x])]
        } else {
            self.data[IxDyn(&[0, y, x])]
        }
    }

    fn flood_fill(&self, visited: &mut [Vec<bool>], start_x: usize, start_y: usize, threshold: f32) -> Region {
        let mut stack = vec![(start_x, start_y)];
        let mut region = Region {
            min_x: start_x,
            max_x: start_x,
            min_y: start_y,
            max_y: start_y,
            count: 0,
            sum: 0.0,
        };

        while let Some((x, y)) = stack.pop() {
            if visited[y][x] {
                continue;
            }
            let prob = self.at(x, y);
            if prob < threshold {
                continue;
            }

            visited[y][x] = true;
            region.count += 1;
            region.sum += prob;
            region.min_x = region.min_x.min(x);
            region.max_x = region.max_x.max(x);
            region.min_y = region.min_y.min(y);
            region.max_y = region.max_y.max(y);

            if x > 0 {
                stack.push((x - 1, y));
            }
            if x + 1 < self.width {
                stack.push((x + 1, y));
            }
            if y > 0 {
                stack.push((x, y - 1));
            }
            if y + 1 < self.height {
                stack.push((x, y + 1));
            }
        }

        region
    }
}
