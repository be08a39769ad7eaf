//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::UploadedFile;
use crate::server::state::AppState;
use crate::types::IngestResponse;

/// POST /upload - store every file part in the vector index
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        // Non-file form fields carry nothing to ingest.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let filename = if filename.trim().is_empty() {
            format!("file_{}.bin", Uuid::new_v4())
        } else {
            filename
        };

        let data = field.bytes().await.map_err(|e| {
            Error::InvalidRequest(format!("Failed to read file '{}': {}", filename, e))
        })?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        files.push(UploadedFile { filename, data });
    }

    let summary = state.pipeline().ingest_uploads(files).await?;
    Ok(Json(IngestResponse::from(summary)))
}
