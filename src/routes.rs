//! HTTP surface: `/upload`, `/files` and `/health`.

use crate::error::{ApiError, IntakeError};
use crate::intake::{FileResult, IntakePipeline};
use crate::staging::{StagingArea, UploadedFile};
use crate::store::StoredRecord;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Multipart field that carries the batch.
const FILES_FIELD: &str = "files";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: IntakePipeline,
    pub staging: StagingArea,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload_files))
        .route("/files", get(list_files))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub results: Vec<FileResult>,
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Stage every uploaded file, then run the batch through the pipeline.
async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files = Vec::new();

    if let Err(err) = stage_parts(&state.staging, &mut multipart, &mut files).await {
        for file in &files {
            if let Err(e) = tokio::fs::remove_file(&file.storage_path).await {
                warn!("Failed to remove {:?}: {}", file.storage_path, e);
            }
        }
        return Err(err);
    }

    info!("Received {} files", files.len());
    let results = state.pipeline.process_batch(&files).await?;

    Ok(Json(UploadResponse {
        message: "Files uploaded and processed successfully",
        results,
    }))
}

async fn stage_parts(
    staging: &StagingArea,
    multipart: &mut Multipart,
    files: &mut Vec<UploadedFile>,
) -> Result<(), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(ApiError::Multipart)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field.bytes().await.map_err(ApiError::Multipart)?;

        let file = staging
            .stage(&filename, &mime_type, &data)
            .await
            .map_err(|source| IntakeError::Staging {
                filename: filename.clone(),
                source,
            })?;
        files.push(file);
    }

    Ok(())
}

/// List every processed file.
async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<StoredRecord>>, ApiError> {
    state
        .pipeline
        .store()
        .find_all()
        .await
        .map(Json)
        .map_err(ApiError::ListFiles)
}
