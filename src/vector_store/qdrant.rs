//! Qdrant vector store over the REST API.

use super::{ChunkPayload, Point, PointFilter, SearchResult, VectorStore};
use crate::error::{EngageError, Result};
use crate::openai::{http_client, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Payload fields that get keyword indexes for filtered search.
const INDEXED_FIELDS: [&str; 3] = ["widgetId", "businessId", "itemId"];

/// Points per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    payload: Option<ChunkPayload>,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

/// Qdrant-backed vector store.
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantStore {
    /// Create a new store for a collection.
    pub fn new(url: &str, api_key: Option<&str>, collection: &str) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            collection: collection.to_string(),
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| EngageError::VectorStore(format!("{} failed: {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngageError::VectorStore(format!(
                "{} failed with {}: {}",
                action, status, text
            )));
        }

        Ok(response)
    }

    async fn create_payload_indexes(&self) {
        for field in INDEXED_FIELDS {
            let body = json!({ "field_name": field, "field_schema": "keyword" });
            let builder = self
                .request(reqwest::Method::PUT, &self.collection_url("/index?wait=true"))
                .json(&body);

            if let Err(e) = self.send(builder, "Create payload index").await {
                warn!("Could not index payload field {}: {}", field, e);
            }
        }
    }
}

/// Translate a payload filter into Qdrant's `must` clause form.
fn filter_json(filter: &PointFilter) -> Value {
    let conditions: Vec<Value> = [
        ("businessId", &filter.business_id),
        ("widgetId", &filter.widget_id),
        ("itemId", &filter.item_id),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
        value
            .as_ref()
            .map(|v| json!({ "key": key, "match": { "value": v } }))
    })
    .collect();

    json!({ "must": conditions })
}

fn point_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    #[instrument(skip(self))]
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let existing = self
            .request(reqwest::Method::GET, &self.collection_url(""))
            .send()
            .await
            .map_err(|e| EngageError::VectorStore(format!("Collection lookup failed: {}", e)))?;

        if existing.status().is_success() {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection {} ({} dimensions)", self.collection, dimensions);
        let body = json!({ "vectors": { "size": dimensions, "distance": "Cosine" } });
        let builder = self
            .request(reqwest::Method::PUT, &self.collection_url(""))
            .json(&body);
        self.send(builder, "Create collection").await?;

        self.create_payload_indexes().await;
        Ok(())
    }

    #[instrument(skip(self, points), fields(count = points.len()))]
    async fn upsert(&self, points: &[Point]) -> Result<usize> {
        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let body = json!({
                "points": batch
                    .iter()
                    .map(|p| json!({ "id": p.id.to_string(), "vector": p.vector, "payload": p.payload }))
                    .collect::<Vec<_>>()
            });
            let builder = self
                .request(reqwest::Method::PUT, &self.collection_url("/points?wait=true"))
                .json(&body);
            self.send(builder, "Upsert").await?;
        }

        debug!("Upserted {} points into {}", points.len(), self.collection);
        Ok(points.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        filter: &PointFilter,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let body = json!({
            "vector": query_embedding,
            "limit": limit,
            "with_payload": true,
            "score_threshold": min_score,
            "filter": filter_json(filter),
        });
        let builder = self
            .request(reqwest::Method::POST, &self.collection_url("/points/search"))
            .json(&body);

        let parsed: QdrantResponse<Vec<ScoredPoint>> = self
            .send(builder, "Search")
            .await?
            .json()
            .await
            .map_err(|e| EngageError::VectorStore(format!("Invalid search response: {}", e)))?;

        let results: Vec<SearchResult> = parsed
            .result
            .into_iter()
            .filter_map(|p| {
                let payload = p.payload?;
                Some(SearchResult {
                    id: point_id(&p.id),
                    payload,
                    score: p.score,
                })
            })
            .collect();

        debug!("Qdrant returned {} hits", results.len());
        Ok(results)
    }

    async fn count(&self, filter: &PointFilter) -> Result<usize> {
        let body = json!({ "filter": filter_json(filter), "exact": true });
        let builder = self
            .request(reqwest::Method::POST, &self.collection_url("/points/count"))
            .json(&body);

        let parsed: QdrantResponse<CountResult> = self
            .send(builder, "Count")
            .await?
            .json()
            .await
            .map_err(|e| EngageError::VectorStore(format!("Invalid count response: {}", e)))?;

        Ok(parsed.result.count)
    }

    #[instrument(skip(self))]
    async fn delete(&self, filter: &PointFilter) -> Result<usize> {
        if filter.is_empty() {
            return Err(EngageError::InvalidInput(
                "Refusing to delete without a filter".to_string(),
            ));
        }

        let matching = self.count(filter).await?;
        if matching == 0 {
            return Ok(0);
        }

        let body = json!({ "filter": filter_json(filter) });
        let builder = self
            .request(reqwest::Method::POST, &self.collection_url("/points/delete?wait=true"))
            .json(&body);
        self.send(builder, "Delete").await?;

        info!("Deleted {} points from {}", matching, self.collection);
        Ok(matching)
    }

    async fn health_check(&self) -> Result<()> {
        let builder = self.request(reqwest::Method::GET, &format!("{}/collections", self.base_url));
        self.send(builder, "Health check").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_json() {
        let filter = PointFilter::business("biz-1", Some("w1".to_string()));
        let json = filter_json(&filter);
        let must = json["must"].as_array().unwrap();

        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["key"], "businessId");
        assert_eq!(must[0]["match"]["value"], "biz-1");
        assert_eq!(must[1]["key"], "widgetId");
    }

    #[test]
    fn test_parse_search_response() {
        let raw = r#"{
            "result": [
                {"id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26", "version": 3, "score": 0.82,
                 "payload": {"businessId": "b", "widgetId": "w", "itemId": "i", "title": "FAQ",
                             "type": "faq", "text": "We open at 9", "chunkIndex": 0, "totalChunks": 1}},
                {"id": 42, "version": 1, "score": 0.4, "payload": null}
            ],
            "status": "ok",
            "time": 0.001
        }"#;
        let parsed: QdrantResponse<Vec<ScoredPoint>> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.result.len(), 2);
        assert_eq!(point_id(&parsed.result[0].id), "5c56c793-69f3-4fbf-87e6-c4bf54c28c26");
        assert_eq!(point_id(&parsed.result[1].id), "42");

        let payload = parsed.result[0].payload.as_ref().unwrap();
        assert_eq!(payload.doc_type, "faq");
        assert_eq!(payload.text, "We open at 9");
    }

    #[test]
    fn test_collection_url() {
        let store = QdrantStore::new("https://qdrant.example:6333/", Some(""), "kb").unwrap();
        assert_eq!(store.collection_url("/points/search"), "https://qdrant.example:6333/collections/kb/points/search");
        assert!(store.api_key.is_none());
    }
}
