//! Error types for the intake pipeline and their HTTP mapping.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// Failures that abort an upload batch.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("No files uploaded.")]
    NoFiles,

    #[error("OCR failed for {filename}: {source}")]
    Ocr {
        filename: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to persist record for {filename}: {source}")]
    Persistence {
        filename: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to stage {filename}: {source}")]
    Staging {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// Error returned by the HTTP handlers. The client only ever sees the short
/// message; the cause is logged.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Unreadable or oversized multipart body; carries axum's own status.
    Multipart(MultipartError),
    Upload(IntakeError),
    ListFiles(anyhow::Error),
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::NoFiles => ApiError::BadRequest(err.to_string()),
            other => ApiError::Upload(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Multipart(err) => {
                let status = err.status();
                warn!("Multipart error ({}): {}", status, err);
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "Upload too large"
                } else {
                    "Invalid multipart body"
                };
                (status, message.to_string())
            }
            ApiError::Upload(err) => {
                error!("Upload Error: {:#}", anyhow::Error::new(err));
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error during file upload".to_string(),
                )
            }
            ApiError::ListFiles(err) => {
                error!("Database Fetch Error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error retrieving files".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_files_is_client_error() {
        let response = ApiError::from(IntakeError::NoFiles).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_pipeline_failures_are_server_errors() {
        let err = IntakeError::Ocr {
            filename: "scan.png".to_string(),
            source: anyhow::anyhow!("tesseract exited with 1"),
        };
        assert!(err.to_string().contains("scan.png"));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
