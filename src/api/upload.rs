//! Image upload, download and deletion.

use super::error::{ApiError, ApiResult};
use crate::error::EngageError;
use crate::state::AppState;
use crate::storage::{BlobStore, Folder, UploadOwner};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/svg+xml"];

fn blob_store(state: &AppState) -> ApiResult<&Arc<dyn BlobStore>> {
    state
        .backends
        .blob_store
        .as_ref()
        .ok_or_else(|| EngageError::Unavailable("Object storage is not configured".to_string()).into())
}

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    let mut multipart = multipart?;
    let store = blob_store(&state)?;

    let mut file = None;
    let mut owner = UploadOwner::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_guess::from_path(&filename).first_or_octet_stream().to_string());
                file = Some((filename, content_type, field.bytes().await?));
            }
            "workspace_id" => owner.workspace_id = Some(field.text().await?),
            "agent_id" => owner.agent_id = Some(field.text().await?),
            _ => {}
        }
    }

    let (filename, content_type, data) = file.ok_or_else(|| ApiError::bad_request("file is required"))?;

    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::bad_request("Invalid file type. Allowed types: JPG, PNG, SVG"));
    }
    let max_bytes = state.settings.storage.max_image_bytes;
    if data.len() > max_bytes {
        return Err(ApiError::bad_request(format!(
            "File size exceeds {} KiB limit",
            max_bytes / 1024
        )));
    }

    let stored = store
        .put(Folder::Images, &filename, data.to_vec(), &content_type, &owner)
        .await?;

    Ok(Json(json!({
        "success": true,
        "file_url": stored.url,
        "file_key": stored.key,
        "original_filename": stored.original_filename,
    })))
}

/// Only uploaded images are reachable through this route; archived documents are not.
fn image_key(key: Result<Path<String>, PathRejection>) -> ApiResult<String> {
    let Path(key) = key?;
    if !Folder::Images.contains(&key) {
        return Err(EngageError::NotFound(format!("File {}", key)).into());
    }
    Ok(key)
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    key: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let key = image_key(key)?;
    let blob = blob_store(&state)?.get(&key).await?;
    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.data).into_response())
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    key: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let key = image_key(key)?;
    blob_store(&state)?.delete(&key).await?;
    Ok(Json(json!({ "success": true, "file_key": key })))
}
