// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preparation for the PaddleOCR detector and recognizer

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

use crate::pipeline::BoundingBox;

/// Side of the square detector input
pub const DET_INPUT_SIZE: u32 = 640;

/// Recognizer line height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Recognizer line width cap; longer lines are squeezed
pub const REC_MAX_WIDTH: u32 = 320;

const REC_MIN_WIDTH: u32 = 4;

/// ImageNet channel statistics both PaddleOCR models were trained with
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

const PAD_GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Detector input for a card image, plus the letterbox used to build it
pub fn detection_input(image: &DynamicImage) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let letterbox = Letterbox::fit(width, height, DET_INPUT_SIZE);
    (to_nchw(&letterbox.apply(image)), letterbox)
}

/// Recognizer input for one cropped text line
pub fn recognition_input(line: &DynamicImage) -> Array4<f32> {
    let (width, height) = line.dimensions();
    let scaled_width = (width as f32 * REC_INPUT_HEIGHT as f32 / height.max(1) as f32).round() as u32;
    let target_width = scaled_width.clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = line.resize_exact(target_width, REC_INPUT_HEIGHT, FilterType::Lanczos3);
    to_nchw(&resized.to_rgb8())
}

fn to_nchw(rgb: &RgbImage) -> Array4<f32> {
    let (width, height) = rgb.dimensions();
    Array4::from_shape_fn((1, 3, height as usize, width as usize), |(_, c, y, x)| {
        let value = rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
        (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c]
    })
}

/// Aspect-preserving fit of a source image into a gray square
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    /// Left and top padding in input pixels
    pub pad: (u32, u32),
    /// Source image size
    pub source: (u32, u32),
    pub side: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, side: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                pad: (0, 0),
                source: (width, height),
                side,
            };
        }

        let scale = (side as f32 / width as f32).min(side as f32 / height as f32);
        let (fitted_w, fitted_h) = Self::scaled(width, height, scale, side);

        Self {
            scale,
            pad: ((side - fitted_w) / 2, (side - fitted_h) / 2),
            source: (width, height),
            side,
        }
    }

    fn scaled(width: u32, height: u32, scale: f32, side: u32) -> (u32, u32) {
        (
            ((width as f32 * scale).round() as u32).clamp(1, side),
            ((height as f32 * scale).round() as u32).clamp(1, side),
        )
    }

    /// Render `image` into the padded square
    pub fn apply(&self, image: &DynamicImage) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(self.side, self.side, PAD_GRAY);
        let (width, height) = self.source;
        if width == 0 || height == 0 {
            return canvas;
        }

        let (fitted_w, fitted_h) = Self::scaled(width, height, self.scale, self.side);
        let fitted = image
            .resize_exact(fitted_w, fitted_h, FilterType::Lanczos3)
            .to_rgb8();
        imageops::replace(&mut canvas, &fitted, self.pad.0 as i64, self.pad.1 as i64);
        canvas
    }

    /// Input-space point to source-space point
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad.0 as f32) / self.scale,
            (y - self.pad.1 as f32) / self.scale,
        )
    }

    /// Input-space rectangle to a source-space box clamped to the image
    ///
    /// `None` when the rectangle lies entirely in the padding.
    pub fn to_source_box(&self, x: f32, y: f32, width: f32, height: f32) -> Option<BoundingBox> {
        let (max_x, max_y) = (self.source.0 as f32, self.source.1 as f32);
        let (left, top) = self.to_source(x, y);
        let (right, bottom) = self.to_source(x + width, y + height);

        let left = left.clamp(0.0, max_x).floor();
        let top = top.clamp(0.0, max_y).floor();
        let right = right.clamp(0.0, max_x).ceil();
        let bottom = bottom.clamp(0.0, max_y).ceil();

        let bbox = BoundingBox {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        };
        (!bbox.is_empty()).then_some(bbox)
    }
}
