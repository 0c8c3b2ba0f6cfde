//! OCR Engine Layer
//!
//! Wraps the text recognition engine behind a small trait so the HTTP
//! handlers can be exercised against a mock recognizer in tests. The
//! production backend runs the ocrs detection and recognition models.

pub mod models;
pub mod ocrs_backend;

use image::RgbImage;
use thiserror::Error;

pub use models::{ModelKind, ModelManager};
pub use ocrs_backend::OcrsRecognizer;

/// Errors surfaced by a recognizer invocation
#[derive(Debug, Error)]
pub enum OcrError {
    /// The pixel buffer could not be consumed by the engine
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The engine itself failed mid-inference
    #[error("engine error: {0}")]
    Engine(String),
}

/// A single recognized word or text fragment
#[derive(Debug, Clone)]
pub struct OcrWord {
    /// Recognized text content
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

/// An ordered line of recognized words
#[derive(Debug, Clone, Default)]
pub struct OcrLine {
    /// Words in reading order
    pub words: Vec<OcrWord>,
}

impl OcrLine {
    /// Build a line from plain strings with full confidence
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| OcrWord {
                    text: w.into(),
                    confidence: 1.0,
                })
                .collect(),
        }
    }
}

/// Text recognition engine interface
///
/// Implementations are constructed once at startup and shared across
/// requests. `recognize` takes `&self`, so implementations must be safe
/// for concurrent invocation (lock internally if the backend is not).
pub trait TextRecognizer: Send + Sync {
    /// Run OCR on a decoded color image, returning lines in engine order
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>, OcrError>;
}

/// Flatten recognized lines into a single space-joined string.
///
/// Fragments keep engine order across line boundaries; empty fragments
/// are skipped so the result never carries doubled separators.
pub fn flatten_text(lines: &[OcrLine]) -> String {
    lines
        .iter()
        .flat_map(|line| line.words.iter())
        .map(|word| word.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_empty() {
        assert_eq!(flatten_text(&[]), "");
    }

    #[test]
    fn test_flatten_single_line() {
        let lines = vec![OcrLine::from_words(["HELLO", "WORLD"])];
        assert_eq!(flatten_text(&lines), "HELLO WORLD");
    }

    #[test]
    fn test_flatten_joins_across_lines() {
        let lines = vec![
            OcrLine::from_words(["line", "one"]),
            OcrLine::from_words(["line", "two"]),
        ];
        assert_eq!(flatten_text(&lines), "line one line two");
    }

    #[test]
    fn test_flatten_skips_empty_fragments() {
        let lines = vec![
            OcrLine::from_words(["", "HELLO"]),
            OcrLine::from_words(["  "]),
            OcrLine::from_words(["WORLD"]),
        ];
        assert_eq!(flatten_text(&lines), "HELLO WORLD");
    }

    #[test]
    fn test_flatten_preserves_engine_order() {
        let lines = vec![
            OcrLine::from_words(["c"]),
            OcrLine::from_words(["a"]),
            OcrLine::from_words(["b"]),
        ];
        assert_eq!(flatten_text(&lines), "c a b");
    }
}
