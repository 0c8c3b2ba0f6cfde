//! Production recognizer backed by the ocrs engine
//!
//! Detection finds word regions, line finding groups them into reading
//! order, recognition decodes each line. Orientation of rotated text is
//! handled by the engine's detection stage, which produces rotated
//! rectangles rather than axis-aligned boxes.

use anyhow::{Context, Result};
use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use std::path::Path;
use tracing::{debug, info};

use super::{OcrError, OcrLine, OcrWord, TextRecognizer};

/// Text recognizer running the ocrs detection and recognition models
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Load both models and build the engine
    pub fn new(detection_model: &Path, recognition_model: &Path) -> Result<Self> {
        info!(
            "Loading OCR models: detection={:?} recognition={:?}",
            detection_model, recognition_model
        );

        let detection = Model::load_file(detection_model)
            .with_context(|| format!("Failed to load detection model {:?}", detection_model))?;
        let recognition = Model::load_file(recognition_model)
            .with_context(|| format!("Failed to load recognition model {:?}", recognition_model))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection),
            recognition_model: Some(recognition),
            ..Default::default()
        })
        .context("Failed to create OCR engine")?;

        info!("OCR engine initialized");
        Ok(Self { engine })
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>, OcrError> {
        let (width, height) = image.dimensions();
        debug!("Running OCR on {}x{} image", width, height);

        let source = ImageSource::from_bytes(image.as_raw(), (width, height))
            .map_err(|e| OcrError::InvalidInput(e.to_string()))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        let lines: Vec<OcrLine> = line_texts
            .iter()
            .flatten()
            .map(|line| OcrLine {
                words: line
                    .words()
                    .map(|word| OcrWord {
                        text: word.to_string(),
                        // ocrs does not expose per-word confidence; report
                        // full confidence for accepted detections
                        confidence: 1.0,
                    })
                    .filter(|word| !word.text.trim().is_empty())
                    .collect(),
            })
            .filter(|line| !line.words.is_empty())
            .collect();

        debug!("OCR complete: {} text lines", lines.len());
        Ok(lines)
    }
}
