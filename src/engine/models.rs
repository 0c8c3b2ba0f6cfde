//! Model management for the OCR engine
//!
//! Handles downloading and caching of the ocrs detection and recognition
//! model files. Models are fetched once into the platform data directory
//! and verified by size, with the SHA-256 digest recorded in a manifest.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Model files required by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Text detection model
    Detection,
    /// Text recognition model
    Recognition,
}

impl ModelKind {
    /// Filename under the models directory
    pub fn filename(&self) -> &'static str {
        match self {
            ModelKind::Detection => "text-detection.rten",
            ModelKind::Recognition => "text-recognition.rten",
        }
    }

    /// Download URL (ocrs models published on Hugging Face)
    pub fn download_url(&self) -> &'static str {
        match self {
            ModelKind::Detection => {
                "https://huggingface.co/robertknight/ocrs/resolve/main/text-detection-ssfbcj81.rten"
            }
            ModelKind::Recognition => {
                "https://huggingface.co/robertknight/ocrs/resolve/main/text-rec-checkpoint-s52qdbqt.rten"
            }
        }
    }

    /// Plausible file size range in bytes, used as an integrity check
    pub fn expected_size_range(&self) -> (u64, u64) {
        match self {
            ModelKind::Detection => (500_000, 20_000_000),
            ModelKind::Recognition => (1_000_000, 40_000_000),
        }
    }

    /// Display name for log output
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Detection => "Text Detection",
            ModelKind::Recognition => "Text Recognition",
        }
    }
}

/// Manifest tracking downloaded models
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Downloads and caches the engine model files
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a manager rooted at the platform data directory
    pub fn new() -> Result<Self> {
        let proj_dirs = directories::ProjectDirs::from("dev", "snaptext", "snaptext")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let models_dir = proj_dirs.data_dir().join("models");
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    /// Create a manager with a custom models directory
    pub fn with_dir(models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    /// Path to the models directory
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Path to a specific model file
    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        self.models_dir.join(kind.filename())
    }

    /// Check whether a model file is present and plausibly sized
    pub fn is_model_available(&self, kind: ModelKind) -> bool {
        let path = self.model_path(kind);
        match std::fs::metadata(&path) {
            Ok(meta) => {
                let (min, max) = kind.expected_size_range();
                meta.len() >= min && meta.len() <= max
            }
            Err(_) => false,
        }
    }

    /// Check whether both required models are available
    pub fn are_models_ready(&self) -> bool {
        self.is_model_available(ModelKind::Detection)
            && self.is_model_available(ModelKind::Recognition)
    }

    /// Ensure a model is present, downloading it when permitted.
    /// Returns the path to the model file.
    pub async fn ensure_model(&self, kind: ModelKind, allow_download: bool) -> Result<PathBuf> {
        let path = self.model_path(kind);

        if self.is_model_available(kind) {
            debug!("Model {:?} already available at {:?}", kind, path);
            return Ok(path);
        }

        if !allow_download || std::env::var("SNAPTEXT_OFFLINE").is_ok() {
            anyhow::bail!(
                "{} model missing and downloads are disabled. Download manually from {} and place at {:?}",
                kind.display_name(),
                kind.download_url(),
                path
            );
        }

        self.download_model(kind).await?;

        if !self.is_model_available(kind) {
            anyhow::bail!("Download completed but model verification failed");
        }

        Ok(path)
    }

    /// Ensure both required models are present
    pub async fn ensure_all_models(&self, allow_download: bool) -> Result<()> {
        self.ensure_model(ModelKind::Detection, allow_download)
            .await?;
        self.ensure_model(ModelKind::Recognition, allow_download)
            .await?;
        Ok(())
    }

    /// Stream a model file to disk, hashing as we go
    async fn download_model(&self, kind: ModelKind) -> Result<()> {
        let url = kind.download_url();
        let path = self.model_path(kind);

        info!("Downloading {} model from {}", kind.display_name(), url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .await
            .context("Failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}: {}", response.status(), url);
        }

        debug!("Download size: {:?} bytes", response.content_length());

        // Write to a temp file first so a failed download never leaves a
        // truncated model behind
        let temp_path = path.with_extension("tmp");
        let mut file =
            std::fs::File::create(&temp_path).context("Failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;
            file.write_all(&chunk).context("Failed to write to temp file")?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }

        file.flush().context("Failed to flush temp file")?;
        drop(file);

        let sha256 = format!("{:x}", hasher.finalize());
        std::fs::rename(&temp_path, &path)
            .context("Failed to move downloaded file to final location")?;

        self.record_in_manifest(kind, downloaded, sha256)?;

        info!(
            "Successfully downloaded {} model ({} bytes)",
            kind.display_name(),
            downloaded
        );
        Ok(())
    }

    /// Record a downloaded model in the manifest
    fn record_in_manifest(&self, kind: ModelKind, size_bytes: u64, sha256: String) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();

        let info = ModelInfo {
            filename: kind.filename().to_string(),
            size_bytes,
            sha256,
        };

        if let Some(existing) = manifest
            .models
            .iter_mut()
            .find(|m| m.filename == info.filename)
        {
            *existing = info;
        } else {
            manifest.models.push(info);
        }

        self.save_manifest(&manifest)
    }

    /// Load the model manifest
    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let manifest_path = self.models_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(ModelManifest::default())
        }
    }

    /// Save the model manifest
    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let manifest_path = self.models_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }
}
