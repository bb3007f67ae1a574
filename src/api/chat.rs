//! AI chat endpoint.

use super::error::ApiResult;
use crate::error::EngageError;
use crate::rag::{AiResponse, ChatRequest};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Answer a chat turn. Generation problems come back as a handoff body with status 200.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<AiResponse>> {
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(EngageError::InvalidInput("message is required".to_string()).into());
    }

    let response = match &state.rag {
        Some(engine) => engine.respond(&request).await,
        None => AiResponse::error_fallback(
            "Chat model is not configured",
            request.ai_config.model_or(&state.settings.llm.model),
        ),
    };

    Ok(Json(response))
}
