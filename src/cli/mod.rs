// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{start_server, AppState};
use crate::config::ExtractorConfig;
use crate::pipeline::ReconciliationEngine;
use crate::version;
use crate::vision::VisionModelManager;

/// CNIC card extraction service
#[derive(Parser, Debug)]
#[command(name = "cnic-extractor")]
#[command(version)]
#[command(about = "Extract and cross-check CNIC card fields from front and back photos", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "CNIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overrides the configuration
    #[arg(long)]
    pub listen: Option<String>,

    /// Load every model, report availability, and exit
    #[arg(long)]
    pub check_models: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Process one card from image files and print the response envelope
    Extract {
        /// Front image path
        #[arg(long)]
        front: PathBuf,

        /// Back image path
        #[arg(long)]
        back: PathBuf,
    },
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    info!("Starting {}", version::banner());

    let mut config =
        ExtractorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }

    let manager = load_models(&config).await?;

    if cli.check_models {
        return check_models(&manager);
    }

    let engine = manager
        .perception()
        .map(|perception| Arc::new(ReconciliationEngine::new(perception, config.to_pipeline_config())));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, engine, &manager).await,
        Commands::Extract { front, back } => extract(engine, front, back).await,
    }
}

async fn load_models(config: &ExtractorConfig) -> Result<VisionModelManager> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || VisionModelManager::load(&config))
        .await
        .context("Model loading task failed")
}

fn check_models(manager: &VisionModelManager) -> Result<()> {
    for model in manager.list_models() {
        let mark = if model.available { "✅" } else { "❌" };
        println!("{} {} ({})", mark, model.name, model.model_type);
    }

    if !manager.is_ready() {
        anyhow::bail!("One or more perception models failed to load");
    }
    Ok(())
}

async fn serve(
    config: &ExtractorConfig,
    engine: Option<Arc<ReconciliationEngine>>,
    manager: &VisionModelManager,
) -> Result<()> {
    if engine.is_none() {
        warn!("⚠️ Perception models incomplete, extraction requests will fail until restarted");
    }

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .context(format!("Invalid listen address: {}", config.server.listen_addr))?;

    let state = AppState::new(
        engine,
        manager.list_models(),
        Duration::from_secs(config.server.request_timeout_secs),
        config.server.max_image_bytes,
    );

    start_server(state, addr).await
}

async fn extract(engine: Option<Arc<ReconciliationEngine>>, front: PathBuf, back: PathBuf) -> Result<()> {
    let engine = engine.context("Perception models are not loaded")?;

    let front_bytes = tokio::fs::read(&front)
        .await
        .context(format!("Failed to read {}", front.display()))?;
    let back_bytes = tokio::fs::read(&back)
        .await
        .context(format!("Failed to read {}", back.display()))?;

    let response = tokio::task::spawn_blocking(move || engine.process(&front_bytes, &back_bytes))
        .await
        .context("Extraction task failed")?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        anyhow::bail!("Card rejected: {}", response.errors.join(", "));
    }
    Ok(())
}
