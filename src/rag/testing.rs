//! Test doubles for the RAG pipeline.

use crate::embedding::Embedder;
use crate::error::{EngageError, Result};
use crate::llm::{ChatModel, Completion, CompletionRequest};
use crate::rerank::{RerankHit, Reranker};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns the same vector for every text and counts calls.
pub struct CountingEmbedder {
    vector: Vec<f32>,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    fn model(&self) -> &str {
        "counting"
    }
}

pub struct StubReranker {
    fail: bool,
    calls: AtomicUsize,
}

impl StubReranker {
    /// Ranks documents in reverse input order.
    pub fn reversing() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reranker for StubReranker {
    async fn rerank(&self, _query: &str, documents: &[String], top_k: usize) -> Result<Vec<RerankHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngageError::Rerank("stub failure".to_string()));
        }
        let n = documents.len();
        Ok((0..n)
            .rev()
            .take(top_k)
            .enumerate()
            .map(|(rank, index)| RerankHit {
                index,
                relevance_score: 0.9 - rank as f32 * 0.1,
            })
            .collect())
    }

    fn model(&self) -> &str {
        "stub-rerank"
    }
}

/// Replies with a fixed answer and records the last request.
pub struct ScriptedModel {
    reply: std::result::Result<String, String>,
    delay: Duration,
    last_request: Mutex<Option<CompletionRequest>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            last_request: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            ..Self::replying("")
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::replying("too late")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Ok(content) => Ok(Completion {
                content: content.clone(),
                model: request.model.clone(),
                usage: None,
            }),
            Err(e) => Err(EngageError::Llm(e.clone())),
        }
    }
}
