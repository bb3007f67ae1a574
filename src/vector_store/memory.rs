//! In-memory vector store implementation.
//!
//! Useful for testing and local development without a Qdrant instance.

use super::{cosine_similarity, Point, PointFilter, SearchResult, VectorStore};
use crate::error::{EngageError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory vector store.
pub struct MemoryVectorStore {
    points: RwLock<HashMap<Uuid, Point>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            points: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: &[Point]) -> Result<usize> {
        let mut store = self.points.write().await;
        for point in points {
            store.insert(point.id, point.clone());
        }
        Ok(points.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &PointFilter,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let points = self.points.read().await;

        let mut results: Vec<SearchResult> = points
            .values()
            .filter(|p| filter.matches(&p.payload))
            .map(|p| SearchResult {
                id: p.id.to_string(),
                payload: p.payload.clone(),
                score: cosine_similarity(query_embedding, &p.vector),
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn count(&self, filter: &PointFilter) -> Result<usize> {
        let points = self.points.read().await;
        Ok(points.values().filter(|p| filter.matches(&p.payload)).count())
    }

    async fn delete(&self, filter: &PointFilter) -> Result<usize> {
        if filter.is_empty() {
            return Err(EngageError::InvalidInput(
                "Refusing to delete without a filter".to_string(),
            ));
        }

        let mut points = self.points.write().await;
        let initial_len = points.len();
        points.retain(|_, p| !filter.matches(&p.payload));
        Ok(initial_len - points.len())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_payload;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let p1 = Point::new(vec![1.0, 0.0, 0.0], test_payload("w1", "item-1", "Hello world"));
        let p2 = Point::new(vec![0.6, 0.8, 0.0], test_payload("w1", "item-2", "Goodbye world"));
        let p3 = Point::new(vec![1.0, 0.0, 0.0], test_payload("w2", "item-3", "Other widget"));

        store.upsert(&[p1, p2, p3]).await.unwrap();
        assert_eq!(store.count(&PointFilter::default()).await.unwrap(), 3);

        let results = store
            .search(&[1.0, 0.0, 0.0], &PointFilter::widget("w1"), 10, 0.0)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].payload.item_id, "item-1");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_search_threshold() {
        let store = MemoryVectorStore::new();
        store
            .upsert(&[Point::new(vec![0.0, 1.0], test_payload("w1", "item-1", "orthogonal"))])
            .await
            .unwrap();

        let results = store
            .search(&[1.0, 0.0], &PointFilter::widget("w1"), 5, 0.05)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_item() {
        let store = MemoryVectorStore::new();
        let mut first = test_payload("w1", "item-1", "part one");
        first.total_chunks = 2;
        let mut second = first.clone();
        second.chunk_index = 1;

        store
            .upsert(&[
                Point::new(vec![1.0, 0.0], first),
                Point::new(vec![0.0, 1.0], second),
                Point::new(vec![1.0, 1.0], test_payload("w1", "item-2", "keep")),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete(&PointFilter::item("item-1")).await.unwrap(), 2);
        assert_eq!(store.count(&PointFilter::default()).await.unwrap(), 1);
        assert_eq!(store.delete(&PointFilter::item("item-1")).await.unwrap(), 0);
        assert!(store.delete(&PointFilter::default()).await.is_err());
    }
}
