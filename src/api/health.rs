//! Service banner and health report.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Engage Knowledge Base API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
    }))
}

fn availability(configured: bool) -> &'static str {
    if configured {
        "available"
    } else {
        "unavailable"
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let backends = &state.backends;

    let vector_store_check = async {
        match backends.vector_store.health_check().await {
            Ok(()) => "connected",
            Err(e) => {
                warn!("Vector store health check failed: {}", e);
                "disconnected"
            }
        }
    };

    let storage_check = async {
        match &backends.blob_store {
            Some(store) => match store.health_check().await {
                Ok(()) => "connected",
                Err(e) => {
                    warn!("Storage health check failed: {}", e);
                    "disconnected"
                }
            },
            None => "unavailable",
        }
    };

    let (vector_store, storage) = futures::future::join(vector_store_check, storage_check).await;

    let status = if vector_store == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "services": {
            "vector_store": vector_store,
            "embeddings": availability(backends.embedder.is_some()),
            "llm": availability(backends.chat_model.is_some()),
            "reranker": availability(backends.reranker.is_some()),
            "storage": storage,
        }
    }))
}
