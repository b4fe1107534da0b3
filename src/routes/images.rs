use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use crate::campaigns;
use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::images::{self, UploadFile, MAX_FILES_PER_UPLOAD, MAX_FILE_BYTES};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "images";

/// Room for a full batch plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_FILES_PER_UPLOAD * MAX_FILE_BYTES + 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub images: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/images/{campaign_id}/{filename}",
            get(fetch_image).delete(delete_image),
        )
        .route(
            "/api/upload/{campaign_id}",
            post(upload_images).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/download/{campaign_id}", get(download_bundle))
}

async fn fetch_image(
    State(state): State<AppState>,
    Path((campaign_id, filename)): Path<(String, String)>,
) -> AppResult<Response> {
    let (file, len) = state.images.open(&campaign_id, &filename).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

async fn upload_images(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(campaign_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    state.images.campaign_dir(&campaign_id)?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if files.len() == MAX_FILES_PER_UPLOAD {
            return Err(AppError::BadRequest(format!(
                "Too many files: at most {} per upload",
                MAX_FILES_PER_UPLOAD
            )));
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file is missing a filename".into()))?;
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        files.push(UploadFile {
            file_name,
            content_type,
            data,
        });
    }

    images::validate_upload(&files)?;
    campaigns::ensure_campaign(&state.db, &campaign_id)?;
    let stored = state.images.save(&campaign_id, &files).await?;

    tracing::info!(
        campaign = %campaign_id,
        count = stored.len(),
        admin = %admin.username,
        "Uploaded campaign images"
    );

    Ok(Json(json!({ "ok": true, "files": stored })))
}

async fn delete_image(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((campaign_id, filename)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    state.images.delete(&campaign_id, &filename).await?;
    tracing::debug!(admin = %admin.username, "Image delete by admin");
    Ok(Json(json!({ "ok": true })))
}

/// Zip of the requested `imgN` positions. The selection is resolved before
/// any byte is sent, so a bad selection never yields a partial archive.
async fn download_bundle(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Response> {
    let tokens: Vec<String> = query
        .images
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    if tokens.is_empty() {
        return Err(AppError::BadRequest("No images selected".into()));
    }

    let entries = state
        .images
        .resolve_selection(&campaign_id, &tokens)
        .await?;
    tracing::info!(campaign = %campaign_id, count = entries.len(), "Streaming image bundle");

    let disposition = format!(
        "attachment; filename=\"{}-images.zip\"",
        images::sanitize_filename(&campaign_id)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(images::bundle_stream(entries)),
    )
        .into_response())
}
