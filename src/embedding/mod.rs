//! Embedding generation for semantic search and retrieval.

mod openai;
mod voyage;

pub use openai::OpenAIEmbedder;
pub use voyage::VoyageEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single search query.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple documents.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Model identifier, reported by the health endpoint.
    fn model(&self) -> &str;
}

/// Build the configured embedder, or `None` when its API key is missing.
pub fn from_settings(settings: &EmbeddingSettings) -> Result<Option<Arc<dyn Embedder>>> {
    let dims = settings.dimensions as usize;
    let embedder: Option<Arc<dyn Embedder>> = match settings.provider {
        EmbeddingProvider::OpenAI => match settings.openai_api_key.as_deref() {
            Some(key) => Some(Arc::new(OpenAIEmbedder::with_config(key, &settings.model, dims)?)),
            None => None,
        },
        EmbeddingProvider::Voyage => match settings.voyage_api_key.as_deref() {
            Some(key) => Some(Arc::new(VoyageEmbedder::new(key, &settings.model, dims)?)),
            None => None,
        },
    };
    Ok(embedder)
}
