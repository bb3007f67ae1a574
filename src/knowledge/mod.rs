//! Knowledge-base ingestion, search and deletion.
//!
//! Items are chunked, embedded and written as one vector point per chunk. Every point
//! carries its business, widget and item identifiers so later reads and deletes can be
//! scoped without a separate index.

mod document;

pub use document::{extract_text, UploadedFile};

use crate::chunking::RecursiveSplitter;
use crate::embedding::Embedder;
use crate::error::{EngageError, Result};
use crate::storage::{BlobStore, Folder, UploadOwner};
use crate::vector_store::{ChunkPayload, Point, PointFilter, VectorStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A knowledge item submitted as JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: String,
    pub business_id: String,
    pub widget_id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Result of storing an item.
#[derive(Debug, Clone, Serialize)]
pub struct StoreOutcome {
    pub item_id: String,
    pub chunks_created: usize,
    pub point_ids: Vec<String>,
}

/// A multipart document upload.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub widget_id: String,
    pub title: String,
    pub document_type: String,
    pub content: Option<String>,
    /// Raw JSON metadata; `business_id` is read from it when present.
    pub metadata: Option<String>,
    pub file: Option<UploadedFile>,
}

/// Result of an upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub id: String,
    pub chunks_created: usize,
    pub file_url: Option<String>,
}

/// A search hit as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub content: String,
    pub metadata: ChunkPayload,
    pub score: f32,
}

/// Coordinates chunking, embedding, vector storage and file archiving.
pub struct KnowledgeService {
    embedder: Option<Arc<dyn Embedder>>,
    vector_store: Arc<dyn VectorStore>,
    blob_store: Option<Arc<dyn BlobStore>>,
    splitter: RecursiveSplitter,
    score_threshold: f32,
    collection_ready: OnceCell<()>,
}

impl KnowledgeService {
    pub fn new(
        embedder: Option<Arc<dyn Embedder>>,
        vector_store: Arc<dyn VectorStore>,
        splitter: RecursiveSplitter,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            blob_store: None,
            splitter,
            score_threshold: 0.05,
            collection_ready: OnceCell::new(),
        }
    }

    /// Archive uploaded files in this blob store.
    pub fn with_blob_store(mut self, blob_store: Option<Arc<dyn BlobStore>>) -> Self {
        self.blob_store = blob_store;
        self
    }

    /// Minimum similarity for search hits.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    fn embedder(&self) -> Result<&Arc<dyn Embedder>> {
        self.embedder
            .as_ref()
            .ok_or_else(|| EngageError::Unavailable("Embedding provider is not configured".to_string()))
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| self.vector_store.ensure_collection(dimensions))
            .await?;
        Ok(())
    }

    /// Chunk, embed and upsert an item.
    #[instrument(skip(self, item), fields(item_id = %item.id, widget_id = %item.widget_id))]
    pub async fn store(&self, item: KnowledgeItem) -> Result<StoreOutcome> {
        for (field, value) in [
            ("id", &item.id),
            ("businessId", &item.business_id),
            ("widgetId", &item.widget_id),
        ] {
            if value.trim().is_empty() {
                return Err(EngageError::InvalidInput(format!("{} is required", field)));
            }
        }

        let chunks = self.splitter.split(&item.content);
        if chunks.is_empty() {
            return Err(EngageError::InvalidInput("content is empty".to_string()));
        }

        let embedder = self.embedder()?;
        let embeddings = embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(EngageError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        self.ensure_collection(embedder.dimensions()).await?;

        let total_chunks = chunks.len();
        let created_at = Utc::now();
        let points: Vec<Point> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (text, vector))| {
                Point::new(
                    vector,
                    ChunkPayload {
                        business_id: item.business_id.clone(),
                        widget_id: item.widget_id.clone(),
                        item_id: item.id.clone(),
                        title: item.title.clone(),
                        doc_type: item.doc_type.clone(),
                        text,
                        chunk_index,
                        total_chunks,
                        file_name: item.file_name.clone(),
                        file_url: item.file_url.clone(),
                        file_size: item.file_size,
                        created_at,
                    },
                )
            })
            .collect();

        self.vector_store.upsert(&points).await?;
        info!("Stored {} chunks for item {}", total_chunks, item.id);

        Ok(StoreOutcome {
            item_id: item.id,
            chunks_created: total_chunks,
            point_ids: points.iter().map(|p| p.id.to_string()).collect(),
        })
    }

    /// Ingest an uploaded document, extracting file text and archiving the file.
    #[instrument(skip(self, upload), fields(widget_id = %upload.widget_id, document_type = %upload.document_type))]
    pub async fn upload(&self, upload: DocumentUpload) -> Result<UploadOutcome> {
        if upload.widget_id.trim().is_empty() {
            return Err(EngageError::InvalidInput("widget_id is required".to_string()));
        }
        if upload.title.trim().is_empty() {
            return Err(EngageError::InvalidInput("title is required".to_string()));
        }

        let business_id = business_id_from_metadata(upload.metadata.as_deref());
        let item_id = format!("upload-{}", &Uuid::new_v4().simple().to_string()[..8]);

        let mut content = upload.content.clone().unwrap_or_default();
        let mut file_name = None;
        let mut file_size = None;
        let mut file_url = None;

        if let Some(file) = &upload.file {
            content = extract_text(file, &upload.document_type).await?;
            file_name = Some(file.filename.clone());
            file_size = Some(file.data.len() as u64);

            if let Some(blobs) = &self.blob_store {
                let owner = UploadOwner {
                    workspace_id: Some(business_id.clone()),
                    agent_id: Some(upload.widget_id.clone()),
                };
                match blobs
                    .put(
                        Folder::Documents,
                        &file.filename,
                        file.data.clone(),
                        &file.mime_type(),
                        &owner,
                    )
                    .await
                {
                    Ok(stored) => file_url = Some(stored.url),
                    Err(e) => warn!("Could not archive {}: {}", file.filename, e),
                }
            }
        }

        let outcome = self
            .store(KnowledgeItem {
                id: item_id,
                business_id,
                widget_id: upload.widget_id,
                title: upload.title,
                content,
                doc_type: upload.document_type,
                file_name,
                file_url: file_url.clone(),
                file_size,
            })
            .await?;

        Ok(UploadOutcome {
            id: outcome.item_id,
            chunks_created: outcome.chunks_created,
            file_url,
        })
    }

    /// Semantic search within one widget's knowledge.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &str, widget_id: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(EngageError::InvalidInput("query is required".to_string()));
        }
        if widget_id.trim().is_empty() {
            return Err(EngageError::InvalidInput("widgetId is required".to_string()));
        }

        let embedding = self.embedder()?.embed(query).await?;
        let results = self
            .vector_store
            .search(&embedding, &PointFilter::widget(widget_id), limit.max(1), self.score_threshold)
            .await?;

        Ok(results
            .into_iter()
            .map(|r| SearchHit {
                content: r.payload.text.clone(),
                metadata: r.payload,
                score: r.score,
            })
            .collect())
    }

    /// Delete every chunk of an item.
    pub async fn delete_item(&self, item_id: &str) -> Result<usize> {
        if item_id.trim().is_empty() {
            return Err(EngageError::InvalidInput("item id is required".to_string()));
        }
        let deleted = self.vector_store.delete(&PointFilter::item(item_id)).await?;
        info!("Deleted {} chunks for item {}", deleted, item_id);
        Ok(deleted)
    }

    /// Delete everything a business owns, or only one of its widgets.
    ///
    /// A widget of `all` is treated as no widget.
    pub async fn delete_all(&self, business_id: &str, widget_id: Option<&str>) -> Result<usize> {
        if business_id.trim().is_empty() {
            return Err(EngageError::InvalidInput("businessId is required".to_string()));
        }
        let widget_id = widget_id
            .filter(|w| !w.is_empty() && *w != "all")
            .map(str::to_string);
        let deleted = self
            .vector_store
            .delete(&PointFilter::business(business_id, widget_id))
            .await?;
        info!("Deleted {} chunks for business {}", deleted, business_id);
        Ok(deleted)
    }
}

fn business_id_from_metadata(metadata: Option<&str>) -> String {
    metadata
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .and_then(|v| v.get("business_id").and_then(|b| b.as_str()).map(str::to_string))
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
