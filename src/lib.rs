// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod version;
pub mod vision;

pub use config::{ConfigError, ExtractorConfig};
pub use pipeline::{
    CardInfo, CardRecord, ExtractionResponse, Perception, PipelineConfig, PipelineError,
    ReconciliationEngine,
};
pub use vision::{VisionModelInfo, VisionModelManager};
