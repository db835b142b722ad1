// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Card extraction endpoints
//!
//! Provides POST /api/detect/ (multipart) and POST /v1/cnic (base64 JSON).

pub mod handler;
pub mod request;

pub use handler::{detect_handler, detect_json_handler, run_extraction};
pub use request::{read_card_upload, CardImagesRequest, CardUpload};
