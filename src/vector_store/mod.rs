//! Vector store abstraction for Engage.
//!
//! Knowledge items are stored as one point per chunk. Every point carries its owning
//! business, widget and item so that search and deletion can be scoped by payload filter.

mod memory;
mod qdrant;

pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;

use crate::config::{VectorStoreProvider, VectorStoreSettings};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Payload stored alongside each chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    pub business_id: String,
    pub widget_id: String,
    pub item_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Text content of this chunk.
    pub text: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A chunk vector ready to be written.
#[derive(Debug, Clone)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl Point {
    /// Create a point with a fresh identifier.
    pub fn new(vector: Vec<f32>, payload: ChunkPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload,
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Point identifier.
    pub id: String,
    /// The matched chunk.
    pub payload: ChunkPayload,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Payload filter. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointFilter {
    pub business_id: Option<String>,
    pub widget_id: Option<String>,
    pub item_id: Option<String>,
}

impl PointFilter {
    /// Points belonging to a widget.
    pub fn widget(widget_id: impl Into<String>) -> Self {
        Self {
            widget_id: Some(widget_id.into()),
            ..Self::default()
        }
    }

    /// All chunks of a knowledge item.
    pub fn item(item_id: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            ..Self::default()
        }
    }

    /// Points of a business, optionally narrowed to one widget.
    pub fn business(business_id: impl Into<String>, widget_id: Option<String>) -> Self {
        Self {
            business_id: Some(business_id.into()),
            widget_id,
            item_id: None,
        }
    }

    /// Whether the filter constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.business_id.is_none() && self.widget_id.is_none() && self.item_id.is_none()
    }

    /// Whether a payload satisfies every condition.
    pub fn matches(&self, payload: &ChunkPayload) -> bool {
        fn field_ok(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |e| e == actual)
        }
        field_ok(&self.business_id, &payload.business_id)
            && field_ok(&self.widget_id, &payload.widget_id)
            && field_ok(&self.item_id, &payload.item_id)
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection and its payload indexes if they do not exist.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Bulk upsert points.
    async fn upsert(&self, points: &[Point]) -> Result<usize>;

    /// Search for similar chunks matching a filter, dropping hits below `min_score`.
    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &PointFilter,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Count points matching a filter.
    async fn count(&self, filter: &PointFilter) -> Result<usize>;

    /// Delete points matching a filter, returning how many were removed.
    async fn delete(&self, filter: &PointFilter) -> Result<usize>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Build the configured vector store.
pub fn from_settings(settings: &VectorStoreSettings) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match settings.provider {
        VectorStoreProvider::Qdrant => Arc::new(QdrantStore::new(
            &settings.url,
            settings.api_key.as_deref(),
            &settings.collection,
        )?),
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
    };
    Ok(store)
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) fn test_payload(widget_id: &str, item_id: &str, text: &str) -> ChunkPayload {
    ChunkPayload {
        business_id: "biz-1".to_string(),
        widget_id: widget_id.to_string(),
        item_id: item_id.to_string(),
        title: "Test item".to_string(),
        doc_type: "text".to_string(),
        text: text.to_string(),
        chunk_index: 0,
        total_chunks: 1,
        file_name: None,
        file_url: None,
        file_size: None,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_payload_field_names() {
        let mut payload = test_payload("w1", "item-1", "hello");
        payload.file_name = Some("guide.pdf".to_string());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["widgetId"], "w1");
        assert_eq!(json["itemId"], "item-1");
        assert_eq!(json["type"], "text");
        assert_eq!(json["chunkIndex"], 0);
        assert_eq!(json["fileName"], "guide.pdf");
        assert!(json.get("fileUrl").is_none());
    }

    #[test]
    fn test_filter_matching() {
        let payload = test_payload("w1", "item-1", "hello");
        assert!(PointFilter::default().matches(&payload));
        assert!(PointFilter::widget("w1").matches(&payload));
        assert!(!PointFilter::widget("w2").matches(&payload));
        assert!(PointFilter::business("biz-1", None).matches(&payload));
        assert!(!PointFilter::business("biz-1", Some("w2".to_string())).matches(&payload));
        assert!(PointFilter::item("item-1").matches(&payload));
    }
}
