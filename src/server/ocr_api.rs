//! OCR upload endpoint
//!
//! Accepts a single-file multipart upload on the `file` field, decodes it,
//! runs text recognition, and returns the space-joined text as JSON.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};

use super::error::ApiError;
use super::AppState;
use crate::engine::flatten_text;

#[derive(Serialize)]
pub struct OcrResponse {
    pub text: String,
}

/// Handler for `POST /ocr`
///
/// Precondition checks, in order: a `file` field must exist, and its
/// filename must be non-empty. Undecodable bytes are rejected as
/// `Invalid image` rather than left to crash the request.
pub async fn extract_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        // A part without a filename attribute is a plain form value, not a
        // file part
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadUpload(e.to_string()))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload.ok_or(ApiError::MissingFilePart)?;
    if filename.is_empty() {
        return Err(ApiError::EmptyFilename);
    }

    debug!("Received upload '{}' ({} bytes)", filename, data.len());

    let image = image::load_from_memory(&data)
        .map_err(|_| ApiError::InvalidImage)?
        .to_rgb8();

    // Recognition is CPU-bound; keep it off the async workers
    let recognizer = state.recognizer.clone();
    let lines = tokio::task::spawn_blocking(move || recognizer.recognize(&image))
        .await
        .map_err(|e| ApiError::Ocr(e.to_string()))??;

    let text = flatten_text(&lines);
    info!("Extracted {} characters from '{}'", text.len(), filename);

    Ok(Json(OcrResponse { text }))
}

#[cfg(test)]
mod tests {
    use crate::engine::{OcrError, OcrLine, TextRecognizer};
    use crate::server::{build_router, AppState};

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use image::RgbImage;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Recognizer returning a fixed result regardless of input
    struct FixedRecognizer {
        lines: Vec<OcrLine>,
    }

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<OcrLine>, OcrError> {
            Ok(self.lines.clone())
        }
    }

    /// Recognizer that always fails
    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<OcrLine>, OcrError> {
            Err(OcrError::Engine("model exploded".to_string()))
        }
    }

    fn test_router(recognizer: Arc<dyn TextRecognizer>) -> axum::Router {
        build_router(AppState::new(recognizer), 10 * 1024 * 1024)
    }

    fn router_with_text(words: &[&str]) -> axum::Router {
        test_router(Arc::new(FixedRecognizer {
            lines: vec![OcrLine::from_words(words.iter().copied())],
        }))
    }

    const BOUNDARY: &str = "snaptext-test-boundary";

    /// Hand-build a multipart body with a single part
    fn multipart_body(field: &str, filename: Option<&str>, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn ocr_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ocr")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// A tiny valid PNG generated in-memory
    fn png_fixture() -> Vec<u8> {
        let img = RgbImage::from_pixel(32, 16, image::Rgb([255, 255, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    #[tokio::test]
    async fn test_missing_file_part() {
        let app = router_with_text(&["HELLO"]);
        let body = multipart_body("document", Some("scan.png"), &png_fixture());

        let response = app.oneshot(ocr_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(response).await, json!({"error": "No file part"}));
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let app = router_with_text(&["HELLO"]);
        let body = multipart_body("file", Some(""), &png_fixture());

        let response = app.oneshot(ocr_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_json(response).await,
            json!({"error": "No selected file"})
        );
    }

    #[tokio::test]
    async fn test_plain_form_value_is_not_a_file_part() {
        let app = router_with_text(&["HELLO"]);
        let body = multipart_body("file", None, b"just a form value");

        let response = app.oneshot(ocr_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_json(response).await, json!({"error": "No file part"}));
    }

    #[tokio::test]
    async fn test_valid_upload_returns_joined_text() {
        let app = test_router(Arc::new(FixedRecognizer {
            lines: vec![
                OcrLine::from_words(["HELLO"]),
                OcrLine::from_words(["WORLD", "again"]),
            ],
        }));
        let body = multipart_body("file", Some("scan.png"), &png_fixture());

        let response = app.oneshot(ocr_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response_json(response).await,
            json!({"text": "HELLO WORLD again"})
        );
    }

    #[tokio::test]
    async fn test_image_with_no_text() {
        let app = test_router(Arc::new(FixedRecognizer { lines: vec![] }));
        let body = multipart_body("file", Some("blank.png"), &png_fixture());

        let response = app.oneshot(ocr_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, json!({"text": ""}));
    }

    #[tokio::test]
    async fn test_invalid_image_bytes() {
        let app = router_with_text(&["HELLO"]);
        let body = multipart_body("file", Some("notes.png"), b"plain text, not an image");

        let response = app.oneshot(ocr_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_json(response).await,
            json!({"error": "Invalid image"})
        );
    }

    #[tokio::test]
    async fn test_engine_failure_is_structured_500() {
        let app = test_router(Arc::new(FailingRecognizer));
        let body = multipart_body("file", Some("scan.png"), &png_fixture());

        let response = app.oneshot(ocr_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("model exploded"));
    }

    #[tokio::test]
    async fn test_repeated_requests_are_idempotent() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(FixedRecognizer {
            lines: vec![OcrLine::from_words(["HELLO"])],
        });

        let mut texts = Vec::new();
        for _ in 0..2 {
            let app = test_router(recognizer.clone());
            let body = multipart_body("file", Some("scan.png"), &png_fixture());
            let response = app.oneshot(ocr_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            texts.push(response_json(response).await["text"].clone());
        }

        assert_eq!(texts[0], texts[1]);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router_with_text(&[]);
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, json!({"status": "ok"}));
    }
}
