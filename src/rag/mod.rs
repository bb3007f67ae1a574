//! RAG (Retrieval-Augmented Generation) chat for widget agents.
//!
//! A chat turn is classified, grounded in the widget's knowledge base when it needs to be,
//! answered by the configured model and scored for confidence. Failures never surface as
//! errors: the caller always gets an [`AiResponse`], possibly flagged for human handoff.

mod classify;
mod confidence;
mod engine;
mod prompt;
mod retrieval;
#[cfg(test)]
pub(crate) mod testing;

pub use classify::{classify, QueryComplexity};
pub use confidence::{confidence_score, is_substantive, is_uncertain};
pub use engine::RagEngine;
pub use prompt::{build_messages, format_context_for_prompt, PromptContext};
pub use retrieval::{should_rerank, Candidate, RerankDecision, RerankPolicy, Retrieval, Retriever};

use crate::config::ERROR_FALLBACK;
use crate::llm::ChatMessage;
use crate::vector_store::ChunkPayload;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-agent AI settings sent with every chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: String,
    /// Model for this agent; the server's configured model when unset.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub confidence_threshold: f32,
    pub max_retrieval_docs: usize,
    pub rag_enabled: bool,
    pub fallback_to_human: bool,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub reranker_enabled: bool,
    pub reranker_model: String,
    /// Persona preset name, or `custom`.
    pub system_prompt: String,
    pub custom_system_prompt: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openrouter".to_string(),
            model: None,
            temperature: 0.7,
            max_tokens: 500,
            confidence_threshold: 0.6,
            max_retrieval_docs: 5,
            rag_enabled: true,
            fallback_to_human: true,
            embedding_provider: "openai".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            reranker_enabled: true,
            reranker_model: "rerank-2.5-lite".to_string(),
            system_prompt: "support".to_string(),
            custom_system_prompt: String::new(),
        }
    }
}

impl AiConfig {
    /// The requested model, or `fallback` when none (or a blank one) was named.
    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
    }
}

/// How the widget hands conversations over to a human agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerHandoverConfig {
    pub enabled: bool,
    pub show_handover_button: bool,
    pub handover_button_text: String,
    pub handover_button_position: String,
    pub include_in_quick_replies: bool,
    pub auto_detect_keywords: bool,
    pub detection_keywords: Vec<String>,
    pub handover_message: String,
    pub notification_to_agent: bool,
    pub allow_customer_to_switch: bool,
    pub smart_fallback_enabled: bool,
}

impl Default for CustomerHandoverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_handover_button: true,
            handover_button_text: "Talk to Human Agent".to_string(),
            handover_button_position: "bottom".to_string(),
            include_in_quick_replies: true,
            auto_detect_keywords: true,
            detection_keywords: Vec::new(),
            handover_message: "I'll connect you with a human agent right away.".to_string(),
            notification_to_agent: true,
            allow_customer_to_switch: true,
            smart_fallback_enabled: true,
        }
    }
}

impl CustomerHandoverConfig {
    /// Whether uncertain answers should be escalated.
    pub fn smart_fallback(&self) -> bool {
        self.enabled && self.smart_fallback_enabled
    }
}

/// One chat turn.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub widget_id: String,
    pub conversation_id: String,
    pub ai_config: AiConfig,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_handover: Option<CustomerHandoverConfig>,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// A knowledge passage cited in an answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Truncated passage text.
    pub content: String,
    pub metadata: ChunkPayload,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl Source {
    pub(crate) fn from_candidate(candidate: &Candidate, preview_chars: usize) -> Self {
        let text = &candidate.payload.text;
        let content = if text.chars().count() > preview_chars {
            format!("{}...", text.chars().take(preview_chars).collect::<String>())
        } else {
            text.clone()
        };

        Self {
            content,
            metadata: candidate.payload.clone(),
            title: candidate.payload.title.clone(),
            doc_type: candidate.payload.doc_type.clone(),
            score: candidate.score,
            rerank_score: candidate.rerank_score,
        }
    }
}

/// Answer to a chat turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    pub success: bool,
    pub response: String,
    pub confidence: f32,
    pub sources: Vec<Source>,
    pub should_fallback_to_human: bool,
    pub metadata: Map<String, Value>,
}

impl AiResponse {
    /// Handoff response used when no answer could be generated.
    pub fn error_fallback(error: &str, model: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".to_string(), Value::from(error));
        metadata.insert("model".to_string(), Value::from(model));

        Self {
            success: false,
            response: ERROR_FALLBACK.to_string(),
            confidence: 0.0,
            sources: Vec::new(),
            should_fallback_to_human: true,
            metadata,
        }
    }
}
