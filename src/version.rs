// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Release identification for the CNIC extractor

pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

pub const BUILD_DATE: &str = "2026-10-19";

/// Capabilities compiled into this release
pub const FEATURES: &[&str] = &[
    "card-detection",
    "face-presence",
    "paddleocr",
    "qr-cnic",
    "cnic-cross-check",
    "multipart-upload",
    "base64-upload",
];

/// Startup banner, e.g. `CNIC Extractor 0.1.0 (2026-10-19) [card-detection, ...]`
pub fn banner() -> String {
    format!(
        "CNIC Extractor {} ({}) [{}]",
        VERSION_NUMBER,
        BUILD_DATE,
        FEATURES.join(", ")
    )
}
