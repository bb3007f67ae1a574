//! Shared application state.

use crate::chunking;
use crate::config::{Prompts, Settings};
use crate::embedding::{self, Embedder};
use crate::error::Result;
use crate::knowledge::KnowledgeService;
use crate::llm::{ChatModel, OpenRouterModel, ResilientModel};
use crate::rag::{RagEngine, RerankPolicy, Retriever};
use crate::rerank::{self, Reranker};
use crate::reviews::ReviewStore;
use crate::storage::{self, BlobStore};
use crate::vector_store::{self, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Clients for the external services. Missing entries are unconfigured.
#[derive(Clone)]
pub struct Backends {
    pub embedder: Option<Arc<dyn Embedder>>,
    pub vector_store: Arc<dyn VectorStore>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub chat_model: Option<Arc<dyn ChatModel>>,
    pub blob_store: Option<Arc<dyn BlobStore>>,
}

impl Backends {
    /// Connect every client the settings have credentials for.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = embedding::from_settings(&settings.embedding)?;
        if embedder.is_none() {
            warn!("No embedding API key configured; knowledge base and retrieval are disabled");
        }

        let reranker = rerank::from_settings(&settings.reranker)?;

        let chat_model: Option<Arc<dyn ChatModel>> =
            match settings.llm.api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(_) => {
                    let inner: Arc<dyn ChatModel> = Arc::new(OpenRouterModel::new(&settings.llm)?);
                    Some(Arc::new(ResilientModel::new(
                        inner,
                        Duration::from_secs(settings.llm.timeout_secs),
                        settings.llm.max_retries,
                    )))
                }
                None => {
                    warn!("OPENROUTER_API_KEY not set; chat answers will fall back to human handoff");
                    None
                }
            };

        let blob_store = storage::from_settings(&settings.storage).await?;
        if blob_store.is_none() {
            info!("R2 credentials not set; uploads are disabled");
        }

        Ok(Self {
            embedder,
            vector_store: vector_store::from_settings(&settings.vector_store)?,
            reranker,
            chat_model,
            blob_store,
        })
    }
}

/// State injected into every handler.
pub struct AppState {
    pub settings: Settings,
    pub backends: Backends,
    pub knowledge: KnowledgeService,
    /// Absent when no chat model is configured.
    pub rag: Option<RagEngine>,
    pub reviews: ReviewStore,
}

impl AppState {
    /// Build state from settings, connecting to configured services.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let backends = Backends::from_settings(&settings).await?;
        let prompts = Prompts::load(settings.rag.prompts_dir.as_deref())?;
        Ok(Self::new(settings, backends, prompts))
    }

    /// Assemble state around existing clients.
    pub fn new(settings: Settings, backends: Backends, prompts: Prompts) -> Self {
        let knowledge = KnowledgeService::new(
            backends.embedder.clone(),
            backends.vector_store.clone(),
            chunking::from_settings(&settings.chunking),
        )
        .with_blob_store(backends.blob_store.clone())
        .with_score_threshold(settings.vector_store.score_threshold);

        let rag = backends.chat_model.clone().map(|model| {
            let retriever = Retriever::new(backends.embedder.clone(), backends.vector_store.clone())
                .with_reranker(backends.reranker.clone(), RerankPolicy::from(&settings.reranker))
                .with_min_score(settings.vector_store.score_threshold);

            RagEngine::new(retriever, model)
                .with_default_model(settings.llm.model.clone())
                .with_prompts(prompts.chat)
                .with_settings(&settings.rag)
        });

        Self {
            settings,
            backends,
            knowledge,
            rag,
            reviews: ReviewStore::new(),
        }
    }
}
