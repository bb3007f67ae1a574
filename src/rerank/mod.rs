//! Second-stage relevance scoring for retrieved passages.

mod voyage;

pub use voyage::VoyageReranker;

use crate::config::RerankerSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Relevance of one document, referring back to its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankHit {
    /// Index into the documents passed to [`Reranker::rerank`].
    pub index: usize,
    pub relevance_score: f32,
}

/// Trait for reranker implementations.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_k` hits, best first.
    async fn rerank(&self, query: &str, documents: &[String], top_k: usize) -> Result<Vec<RerankHit>>;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// Build the reranker, or `None` when no API key is configured.
pub fn from_settings(settings: &RerankerSettings) -> Result<Option<Arc<dyn Reranker>>> {
    match settings.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Ok(Some(Arc::new(VoyageReranker::new(key, settings)?))),
        None => Ok(None),
    }
}
