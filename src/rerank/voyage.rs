//! Voyage AI reranker via the `/rerank` endpoint.

use super::{RerankHit, Reranker};
use crate::config::RerankerSettings;
use crate::error::{EngageError, Result};
use crate::openai::{http_client, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
    model: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    data: Vec<RerankData>,
}

#[derive(Deserialize)]
struct RerankData {
    index: usize,
    relevance_score: f32,
}

/// Voyage AI reranker.
pub struct VoyageReranker {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl VoyageReranker {
    pub fn new(api_key: &str, settings: &RerankerSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }
}

fn into_hits(data: Vec<RerankData>, document_count: usize) -> Vec<RerankHit> {
    let mut hits: Vec<RerankHit> = data
        .into_iter()
        .filter(|d| d.index < document_count)
        .map(|d| RerankHit {
            index: d.index,
            relevance_score: d.relevance_score,
        })
        .collect();

    hits.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}

#[async_trait]
impl Reranker for VoyageReranker {
    #[instrument(skip(self, query, documents), fields(count = documents.len()))]
    async fn rerank(&self, query: &str, documents: &[String], top_k: usize) -> Result<Vec<RerankHit>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let body = RerankRequest {
            query,
            documents,
            model: &self.model,
            top_k: top_k.min(documents.len()),
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngageError::Rerank(format!("Failed to reach reranker: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngageError::Rerank(format!("Reranker returned {}: {}", status, text)));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| EngageError::Rerank(format!("Failed to parse reranker response: {}", e)))?;

        let hits = into_hits(parsed.data, documents.len());
        debug!("Reranked {} documents into {} hits", documents.len(), hits.len());
        Ok(hits)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_sorted_and_bounded() {
        let raw = r#"{"object":"list","data":[
            {"relevance_score":0.31,"index":0},
            {"relevance_score":0.92,"index":2},
            {"relevance_score":0.5,"index":7}
        ],"model":"rerank-2.5-lite","usage":{"total_tokens":120}}"#;
        let parsed: RerankResponse = serde_json::from_str(raw).unwrap();
        let hits = into_hits(parsed.data, 3);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 2);
        assert_eq!(hits[1].index, 0);
    }

    #[test]
    fn test_request_caps_top_k() {
        let docs = vec!["a".to_string(), "b".to_string()];
        let body = RerankRequest {
            query: "q",
            documents: &docs,
            model: "rerank-2.5-lite",
            top_k: 5usize.min(docs.len()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["top_k"], 2);
        assert_eq!(json["model"], "rerank-2.5-lite");
    }

    #[test]
    fn test_reranker_model_from_settings() {
        let reranker = VoyageReranker::new("pa-test", &RerankerSettings::default()).unwrap();
        assert_eq!(reranker.model(), "rerank-2.5-lite");
    }
}
