//! Knowledge-base endpoints.

use super::error::{ApiError, ApiResult};
use crate::knowledge::{DocumentUpload, KnowledgeItem, UploadedFile};
use crate::state::AppState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn store(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<KnowledgeItem>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(item) = payload?;
    let outcome = state.knowledge.store(item).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Successfully stored {} chunks for item {}",
            outcome.chunks_created, outcome.item_id
        ),
        "chunks_created": outcome.chunks_created,
        "point_ids": outcome.point_ids,
    })))
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    let mut multipart = multipart?;
    let mut upload = DocumentUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?.to_vec();
                if !data.is_empty() {
                    upload.file = Some(UploadedFile {
                        filename,
                        content_type,
                        data,
                    });
                }
            }
            "widget_id" => upload.widget_id = field.text().await?,
            "title" => upload.title = field.text().await?,
            "document_type" => upload.document_type = field.text().await?,
            "content" => upload.content = Some(field.text().await?),
            "metadata" => upload.metadata = Some(field.text().await?),
            _ => {}
        }
    }

    if upload.document_type.is_empty() {
        upload.document_type = "text".to_string();
    }
    let title = upload.title.clone();
    let outcome = state.knowledge.upload(upload).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Document '{}' uploaded and vectorized into {} chunks",
            title, outcome.chunks_created
        ),
        "id": outcome.id,
        "chunks_created": outcome.chunks_created,
        "file_url": outcome.file_url,
        "processing_status": "completed",
    })))
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    query: String,
    widget_id: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let results = state.knowledge.search(&req.query, &req.widget_id, req.limit).await?;

    Ok(Json(json!({
        "success": true,
        "query": req.query,
        "total_results": results.len(),
        "results": results,
    })))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    item_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(item_id) = item_id?;
    let deleted = state.knowledge.delete_item(&item_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully deleted {} vector chunks for item {}", deleted, item_id),
        "deleted_chunks": deleted,
        "item_id": item_id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllRequest {
    #[serde(default)]
    business_id: String,
    #[serde(default)]
    widget_id: Option<String>,
}

pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteAllRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    if req.business_id.trim().is_empty() {
        return Err(ApiError::bad_request("businessId is required"));
    }

    let deleted = state
        .knowledge
        .delete_all(&req.business_id, req.widget_id.as_deref())
        .await?;
    let widget_id = req.widget_id.unwrap_or_else(|| "all".to_string());

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully deleted data for business {}", req.business_id),
        "deleted_chunks": deleted,
        "business_id": req.business_id,
        "widget_id": widget_id,
    })))
}
