//! HTTP API.
//!
//! Routes are grouped the way clients see them: knowledge base, AI chat, review forms and
//! uploads. Handlers translate [`crate::error::EngageError`] into JSON error bodies through
//! [`ApiError`].

mod chat;
mod error;
mod health;
mod knowledge;
mod reviews;
mod upload;

pub use error::{ApiError, ApiResult};

use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Uploaded documents may be larger than axum's default body limit.
const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.server.allowed_origins);

    let knowledge = Router::new()
        .route("/store", post(knowledge::store))
        .route(
            "/upload",
            post(knowledge::upload).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES)),
        )
        .route("/search", post(knowledge::search))
        .route("/delete/{id}", delete(knowledge::delete_item))
        .route("/delete-all", delete(knowledge::delete_all));

    let review_forms = Router::new()
        .route("/business/{business_id}", get(reviews::list_forms))
        .route(
            "/{id}",
            get(reviews::get_form)
                .put(reviews::update_form)
                .delete(reviews::delete_form),
        )
        .route("/{id}/submit", post(reviews::submit))
        .route("/{id}/submissions", get(reviews::submissions))
        .route("/{id}/analytics", get(reviews::analytics));

    let uploads = Router::new()
        .route("/image", post(upload::upload_image))
        .route("/{*key}", get(upload::download).delete(upload::delete));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/ai/chat", post(chat::chat))
        .route("/api/review-forms", post(reviews::create_form))
        .route("/api/review-forms/", post(reviews::create_form))
        .nest("/api/knowledge-base", knowledge)
        .nest("/api/review-forms", review_forms)
        .nest("/api/upload", uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}
