//! Review form endpoints.

use super::error::ApiResult;
use crate::reviews::{CreateFormRequest, SubmitRequest, UpdateFormRequest};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

fn data<T: Serialize>(value: T) -> Json<Value> {
    Json(json!({ "success": true, "data": value }))
}

pub async fn create_form(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateFormRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    Ok(data(state.reviews.create(request).await?))
}

pub async fn list_forms(
    State(state): State<Arc<AppState>>,
    business_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(business_id) = business_id?;
    Ok(data(state.reviews.list_for_business(&business_id).await))
}

pub async fn get_form(
    State(state): State<Arc<AppState>>,
    form_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(form_id) = form_id?;
    Ok(data(state.reviews.get(&form_id).await?))
}

pub async fn update_form(
    State(state): State<Arc<AppState>>,
    form_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateFormRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(form_id) = form_id?;
    let Json(update) = payload?;
    Ok(data(state.reviews.update(&form_id, update).await?))
}

pub async fn delete_form(
    State(state): State<Arc<AppState>>,
    form_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(form_id) = form_id?;
    state.reviews.delete(&form_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Review form deleted successfully",
    })))
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    form_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(form_id) = form_id?;
    let Json(request) = payload?;
    Ok(data(state.reviews.submit(&form_id, request).await?))
}

pub async fn submissions(
    State(state): State<Arc<AppState>>,
    form_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(form_id) = form_id?;
    Ok(data(state.reviews.submissions(&form_id).await?))
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
    form_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(form_id) = form_id?;
    Ok(data(state.reviews.analytics(&form_id).await?))
}
