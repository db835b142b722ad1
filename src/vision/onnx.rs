// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared ONNX Runtime session handling
//!
//! Every perception model runs on CPU. `Session::run` needs exclusive access,
//! so sessions sit behind a mutex and concurrent requests take turns.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::pipeline::PerceptionError;

/// A loaded model with its first input/output names
#[derive(Clone)]
pub struct OnnxSession {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    label: &'static str,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("label", &self.label)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl OnnxSession {
    /// Load a model file into a CPU-only session
    ///
    /// `label` names the model in logs and errors (e.g. "card-detector").
    pub fn load<P: AsRef<Path>>(model_path: P, label: &'static str, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("{} model not found: {}", label, model_path.display());
        }

        info!("Loading {} model from {}", label, model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load {} model from {}",
                label,
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| "output0".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("{} input shape: {:?}", label, input.input_type);
        }
        debug!(
            "{} model loaded - input: {}, output: {}",
            label, input_name, output_name
        );

        info!("✅ {} model loaded successfully (CPU-only)", label);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            label,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run the model on a single NCHW tensor and return its first output
    pub fn run(&self, input: Array4<f32>) -> Result<ArrayD<f32>, PerceptionError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| PerceptionError::SessionPoisoned(self.label))?;

        let input_value = Value::from_array(input).map_err(|e| PerceptionError::Inference {
            model: self.label,
            reason: format!("failed to create input tensor: {}", e),
        })?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| PerceptionError::Inference {
                model: self.label,
                reason: e.to_string(),
            })?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| PerceptionError::InvalidOutput {
                model: self.label,
                reason: e.to_string(),
            })?;

        Ok(output.to_owned())
    }
}
