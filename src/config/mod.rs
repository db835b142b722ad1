// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Defaults, then an optional TOML file, then environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::pipeline::PipelineConfig;
use crate::vision::image_utils::MAX_IMAGE_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub request_timeout_secs: u64,
    /// Largest accepted upload, per image
    pub max_image_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }
}

/// Model file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// YOLOv8 card detector
    pub card_detector_path: PathBuf,
    /// YOLOv8 face detector
    pub face_detector_path: PathBuf,
    /// Directory with det_model.onnx, rec_model.onnx and ppocr_keys_v1.txt
    pub ocr_model_dir: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            card_detector_path: PathBuf::from("./models/best.onnx"),
            face_detector_path: PathBuf::from("./models/face.onnx"),
            ocr_model_dir: PathBuf::from("./models/paddleocr-onnx"),
        }
    }
}

/// Detector and OCR thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub card_confidence: f32,
    pub card_iou: f32,
    pub face_confidence: f32,
    pub min_face_size: u32,
    pub ocr_min_confidence: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            card_confidence: 0.2,
            card_iou: 0.3,
            face_confidence: 0.5,
            min_face_size: 40,
            ocr_min_confidence: 0.3,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub thresholds: ThresholdConfig,
}

impl ExtractorConfig {
    /// Parse a TOML file; missing sections and keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load the optional file, layer the environment on top, and validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |var| env::var(var).ok())
    }

    /// `load` with the environment replaced by `lookup`
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CNIC_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        override_parsed(&lookup, "CNIC_REQUEST_TIMEOUT_SECS", &mut self.server.request_timeout_secs)?;
        override_parsed(&lookup, "CNIC_MAX_IMAGE_BYTES", &mut self.server.max_image_bytes)?;

        if let Some(path) = lookup("ONNX_MODEL_PATH") {
            self.models.card_detector_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("FACE_MODEL_PATH") {
            self.models.face_detector_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("OCR_MODEL_DIR") {
            self.models.ocr_model_dir = PathBuf::from(dir);
        }

        override_parsed(&lookup, "CNIC_CARD_CONFIDENCE", &mut self.thresholds.card_confidence)?;
        override_parsed(&lookup, "CNIC_FACE_CONFIDENCE", &mut self.thresholds.face_confidence)?;
        override_parsed(&lookup, "CNIC_MIN_FACE_SIZE", &mut self.thresholds.min_face_size)?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.listen_addr.trim().is_empty() {
            return Err("Listen address must not be empty".to_string());
        }
        if self.server.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }
        if self.server.max_image_bytes == 0 {
            return Err("Maximum image size must be greater than 0".to_string());
        }
        if self.thresholds.min_face_size == 0 {
            return Err("Minimum face size must be greater than 0".to_string());
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("card_confidence", t.card_confidence),
            ("card_iou", t.card_iou),
            ("face_confidence", t.face_confidence),
            ("ocr_min_confidence", t.ocr_min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }

        Ok(())
    }

    /// Per-request engine settings
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            card_confidence: self.thresholds.card_confidence,
            max_image_bytes: self.server.max_image_bytes,
            ..PipelineConfig::default()
        }
    }
}

fn override_parsed<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(var) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var, value })?;
    }
    Ok(())
}
