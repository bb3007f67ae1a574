//! HTTP API server.

use crate::api;
use crate::cli::Output;
use crate::config::Settings;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

/// Run the HTTP API server until Ctrl+C.
pub async fn run_serve(host: Option<String>, port: Option<u16>, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    let addr = settings.bind_addr();
    let state = Arc::new(AppState::from_settings(settings).await?);
    let services = service_summary(&state);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Engage API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Services:");
    for (name, value) in &services {
        Output::kv(name, value);
    }
    println!();
    println!("Endpoints:");
    Output::route("GET", "/health");
    Output::route("POST", "/api/knowledge-base/{store,upload,search}");
    Output::route("DELETE", "/api/knowledge-base/{delete/:id,delete-all}");
    Output::route("POST", "/api/ai/chat");
    Output::route("*", "/api/review-forms");
    Output::route("POST", "/api/upload/image");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// What each backend resolved to, for the startup banner.
fn service_summary(state: &AppState) -> Vec<(&'static str, String)> {
    let settings = &state.settings;
    let backends = &state.backends;
    let unconfigured = || "not configured".to_string();

    vec![
        (
            "Vector store",
            format!("{} ({})", settings.vector_store.provider, settings.vector_store.collection),
        ),
        (
            "Embeddings",
            backends
                .embedder
                .as_ref()
                .map(|e| format!("{} ({} dims)", e.model(), e.dimensions()))
                .unwrap_or_else(unconfigured),
        ),
        (
            "Chat model",
            backends
                .chat_model
                .as_ref()
                .map(|_| settings.llm.model.clone())
                .unwrap_or_else(unconfigured),
        ),
        (
            "Reranker",
            backends
                .reranker
                .as_ref()
                .map(|_| settings.reranker.model.clone())
                .unwrap_or_else(unconfigured),
        ),
        (
            "Storage",
            backends
                .blob_store
                .as_ref()
                .map(|_| settings.storage.bucket.clone())
                .unwrap_or_else(unconfigured),
        ),
    ]
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::state::Backends;
    use crate::storage::MemoryBlobStore;
    use crate::vector_store::MemoryVectorStore;

    #[test]
    fn test_service_summary() {
        let backends = Backends {
            embedder: None,
            vector_store: Arc::new(MemoryVectorStore::new()),
            reranker: None,
            chat_model: None,
            blob_store: Some(Arc::new(MemoryBlobStore::default())),
        };
        let state = AppState::new(Settings::default(), backends, Prompts::default());

        let summary = service_summary(&state);
        let value = |name: &str| summary.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str());

        assert_eq!(value("Vector store"), Some("qdrant (rexa-engage)"));
        assert_eq!(value("Embeddings"), Some("not configured"));
        assert_eq!(value("Chat model"), Some("not configured"));
        assert_eq!(value("Storage"), Some("rexa-documents"));
    }
}
