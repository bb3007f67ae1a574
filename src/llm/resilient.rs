//! Timeout and retry wrapper for chat models.

use super::{ChatModel, Completion, CompletionRequest};
use crate::error::{EngageError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Wraps a model so each attempt is bounded by `timeout` and failures are retried
/// up to `max_retries` times.
pub struct ResilientModel {
    inner: Arc<dyn ChatModel>,
    timeout: Duration,
    max_retries: u32,
}

impl ResilientModel {
    pub fn new(inner: Arc<dyn ChatModel>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            inner,
            timeout,
            max_retries,
        }
    }
}

#[async_trait]
impl ChatModel for ResilientModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let attempts = self.max_retries + 1;
        let mut last_error = EngageError::Llm("No completion attempts made".to_string());

        for attempt in 1..=attempts {
            let error = match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
                Ok(Ok(completion)) if !completion.content.trim().is_empty() => return Ok(completion),
                Ok(Ok(_)) => EngageError::Llm("Empty response from LLM".to_string()),
                Ok(Err(e)) => e,
                Err(_) => EngageError::LlmTimeout(self.timeout),
            };

            warn!("LLM attempt {}/{} failed: {}", attempt, attempts, error);
            last_error = error;
        }

        Err(last_error)
    }
}
