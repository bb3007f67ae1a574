//! Voyage AI embeddings over the REST API.

use super::Embedder;
use crate::error::{EngageError, Result};
use crate::openai::{http_client, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://api.voyageai.com/v1";

/// Voyage accepts up to 128 inputs per request.
const BATCH_SIZE: usize = 128;

/// Model families that accept `output_dimension`; the rest embed at a fixed size.
const FLEXIBLE_DIMENSION_MODELS: [&str; 3] = ["voyage-3-large", "voyage-3.5", "voyage-code-3"];

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    input_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimension: Option<usize>,
}

fn output_dimension(model: &str, dimensions: usize) -> Option<usize> {
    FLEXIBLE_DIMENSION_MODELS
        .iter()
        .any(|m| model.starts_with(m))
        .then_some(dimensions)
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Voyage AI embedder.
pub struct VoyageEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl VoyageEmbedder {
    /// Create a new Voyage embedder.
    pub fn new(api_key: &str, model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    /// Point the embedder at a different API base.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn request(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            input: texts,
            model: &self.model,
            input_type,
            output_dimension: output_dimension(&self.model, self.dimensions),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngageError::Embedding(format!("Voyage request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngageError::Embedding(format!(
                "Voyage API returned {}: {}",
                status, text
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EngageError::Embedding(format!("Invalid Voyage response: {}", e)))?;

        Ok(order_by_index(parsed.data))
    }
}

fn order_by_index(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()], "query")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngageError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            all_embeddings.extend(self.request(chunk, "document").await?);
        }

        debug!("Generated {} Voyage embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
