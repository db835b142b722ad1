// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding and cropping for the card pipeline

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;

use crate::pipeline::BoundingBox;

/// Default per-image upload limit, 10 MiB
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Card photo formats the pipeline accepts
const ACCEPTED_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Upload is empty")]
    EmptyData,

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Base64 payload is invalid: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Not a supported card photo format (PNG, JPEG, WebP, GIF, BMP, TIFF)")]
    UnsupportedFormat,

    #[error("Photo data is corrupt: {0}")]
    DecodeFailed(String),

    #[error("Photo has no pixels ({0}x{1})")]
    ZeroDimensions(u32, u32),
}

/// What was decoded from one upload
#[derive(Debug, Clone, Copy)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub size_bytes: usize,
}

/// Turn a base64 string (or data URL) into the raw upload bytes
///
/// Oversized payloads are refused before decoding.
pub fn decode_base64_bytes(encoded: &str, max_bytes: usize) -> Result<Vec<u8>, ImageError> {
    let payload = encoded
        .split_once(";base64,")
        .map_or(encoded, |(_, data)| data)
        .trim();

    if payload.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let estimate = payload.len() / 4 * 3;
    if estimate > max_bytes + 3 {
        return Err(ImageError::TooLarge {
            size: estimate,
            limit: max_bytes,
        });
    }

    Ok(STANDARD.decode(payload)?)
}

/// Decode one uploaded card photo, refusing anything above `max_bytes`
pub fn decode_image_bytes_with_limit(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(DynamicImage, ImageInfo), ImageError> {
    match bytes.len() {
        0 => return Err(ImageError::EmptyData),
        size if size > max_bytes => {
            return Err(ImageError::TooLarge {
                size,
                limit: max_bytes,
            })
        }
        _ => {}
    }

    let format = sniff_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroDimensions(width, height));
    }

    Ok((
        decoded,
        ImageInfo {
            width,
            height,
            format,
            size_bytes: bytes.len(),
        },
    ))
}

/// Identify the container from its leading bytes
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    image::guess_format(bytes)
        .ok()
        .filter(|format| ACCEPTED_FORMATS.contains(format))
        .ok_or(ImageError::UnsupportedFormat)
}

/// Crop `image` to `bbox`, clamped to the image bounds
///
/// Returns `None` when the clamped box is empty.
pub fn crop_region(image: &DynamicImage, bbox: &BoundingBox) -> Option<DynamicImage> {
    let (img_w, img_h) = image.dimensions();
    if bbox.x >= img_w || bbox.y >= img_h {
        return None;
    }

    let width = bbox.width.min(img_w - bbox.x);
    let height = bbox.height.min(img_h - bbox.y);
    if width == 0 || height == 0 {
        return None;
    }

    Some(image.crop_imm(bbox.x, bbox.y, width, height))
}
