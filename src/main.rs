//! snaptext - HTTP microservice that extracts text from uploaded images
//!
//! Accepts a multipart image upload on `POST /ocr` and returns the
//! recognized text as JSON. The OCR models are fetched on first start.

mod config;
mod engine;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::engine::{ModelKind, ModelManager, OcrsRecognizer};
use crate::server::AppState;

/// snaptext - image text extraction service
#[derive(Parser, Debug)]
#[command(name = "snaptext")]
#[command(about = "HTTP service that extracts text from uploaded images")]
struct Args {
    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the OCR model files (overrides config)
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Download the OCR models and exit
    #[arg(long)]
    fetch_models: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = load_or_create_config(&args);

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(models_dir) = &args.models_dir {
        config.ocr.models_dir = Some(models_dir.clone());
    }

    let manager = match &config.ocr.models_dir {
        Some(dir) => ModelManager::with_dir(dir.clone())?,
        None => ModelManager::new()?,
    };

    if args.fetch_models {
        manager.ensure_all_models(true).await?;
        info!("Models ready in {:?}", manager.models_dir());
        return Ok(());
    }

    let allow_download = config.ocr.download_models;
    let det_path = manager.ensure_model(ModelKind::Detection, allow_download).await?;
    let rec_path = manager
        .ensure_model(ModelKind::Recognition, allow_download)
        .await?;

    let recognizer = OcrsRecognizer::new(&det_path, &rec_path)?;
    let state = AppState::new(Arc::new(recognizer));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let app = server::build_router(state, config.server.max_upload_bytes);
    server::start_server(addr, app).await
}

/// Load configuration from the CLI path, the platform config dir, or defaults
fn load_or_create_config(args: &Args) -> AppConfig {
    if let Some(path) = &args.config {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => {
                tracing::warn!("Failed to load config {:?}: {}", path, e);
            }
        }
    } else if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }

    info!("Using default configuration");
    AppConfig::default()
}
