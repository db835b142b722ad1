// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! QR code decoding for the card back

use image::DynamicImage;
use std::time::Instant;
use tracing::debug;

use crate::pipeline::{PerceptionError, QrDecoder, QrPayload};

/// QR decoder backed by `rqrr`
///
/// Works on the luma channel of the full frame. The first grid that decodes
/// wins; grids that fail to decode are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrQrDecoder;

impl RqrrQrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl QrDecoder for RqrrQrDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<Option<QrPayload>, PerceptionError> {
        let start = Instant::now();
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32)[0]
            });

        let grids = prepared.detect_grids();
        debug!("Found {} QR grid candidates", grids.len());

        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => {
                    debug!("QR decoded in {}ms", start.elapsed().as_millis());
                    return Ok(Some(content));
                }
                Err(e) => debug!("QR grid failed to decode: {}", e),
            }
        }

        Ok(None)
    }
}
