// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Card upload request types

use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::pipeline::Side;
use crate::vision::decode_base64_bytes;

/// Multipart field carrying the front image
pub const FRONT_FIELD: &str = "front_image";
/// Multipart field carrying the back image
pub const BACK_FIELD: &str = "back_image";

/// Raw bytes for both sides of the card
#[derive(Debug, Clone)]
pub struct CardUpload {
    pub front: Vec<u8>,
    pub back: Vec<u8>,
}

/// JSON request with base64-encoded images
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardImagesRequest {
    #[serde(default)]
    pub front_image: Option<String>,
    #[serde(default)]
    pub back_image: Option<String>,
}

impl CardImagesRequest {
    /// Check both images are present and decode their base64
    pub fn into_upload(self, max_image_bytes: usize) -> Result<CardUpload, ApiError> {
        let front = decode_side(Side::Front, self.front_image, max_image_bytes)?;
        let back = decode_side(Side::Back, self.back_image, max_image_bytes)?;
        Ok(CardUpload { front, back })
    }
}

fn decode_side(side: Side, data: Option<String>, max_image_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let data = data
        .filter(|s| !s.trim().is_empty())
        .ok_or(ApiError::MissingImage(side))?;

    decode_base64_bytes(&data, max_image_bytes).map_err(|e| ApiError::InvalidImage {
        side,
        reason: e.to_string(),
    })
}

/// Collect `front_image` and `back_image` from a multipart body
///
/// Unknown fields are skipped. A repeated field keeps its last value.
pub async fn read_card_upload(multipart: &mut Multipart) -> Result<CardUpload, ApiError> {
    let mut front = None;
    let mut back = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidUpload(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        let slot = match name.as_str() {
            FRONT_FIELD => &mut front,
            BACK_FIELD => &mut back,
            _ => {
                debug!("Skipping multipart field '{}'", name);
                continue;
            }
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidUpload(e.to_string()))?;
        debug!("Received {} ({} bytes)", name, bytes.len());
        *slot = Some(bytes.to_vec());
    }

    Ok(CardUpload {
        front: front.ok_or(ApiError::MissingImage(Side::Front))?,
        back: back.ok_or(ApiError::MissingImage(Side::Back))?,
    })
}
