//! API error taxonomy
//!
//! Every error maps to a status code and the JSON body
//! `{"error": "<message>"}`. Client input errors are 400s; engine
//! failures surface as structured 500s instead of crashing the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::engine::OcrError;

/// Errors returned by the OCR endpoint
#[derive(Debug, Error)]
pub enum ApiError {
    /// No form field named `file` in the upload
    #[error("No file part")]
    MissingFilePart,
    /// A `file` field was present but its filename was empty
    #[error("No selected file")]
    EmptyFilename,
    /// The uploaded bytes did not decode to a supported image
    #[error("Invalid image")]
    InvalidImage,
    /// The multipart body itself could not be read
    #[error("Malformed upload: {0}")]
    BadUpload(String),
    /// The OCR engine failed mid-inference
    #[error("OCR failed: {0}")]
    Ocr(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFilePart
            | ApiError::EmptyFilename
            | ApiError::InvalidImage
            | ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::Ocr(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OcrError> for ApiError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::InvalidInput(msg) => ApiError::BadUpload(msg),
            OcrError::Engine(msg) => ApiError::Ocr(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_400() {
        assert_eq!(ApiError::MissingFilePart.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::EmptyFilename.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidImage.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_errors_are_500() {
        let err = ApiError::Ocr("inference failed".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_messages_match_api_contract() {
        assert_eq!(ApiError::MissingFilePart.to_string(), "No file part");
        assert_eq!(ApiError::EmptyFilename.to_string(), "No selected file");
        assert_eq!(ApiError::InvalidImage.to_string(), "Invalid image");
    }

    #[test]
    fn test_ocr_error_conversion() {
        let api: ApiError = OcrError::Engine("boom".to_string()).into();
        assert!(matches!(api, ApiError::Ocr(_)));

        let api: ApiError = OcrError::InvalidInput("bad buffer".to_string()).into();
        assert!(matches!(api, ApiError::BadUpload(_)));
    }
}
