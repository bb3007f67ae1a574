//! Chat turn orchestration.

use super::{
    build_messages, classify, confidence_score, is_substantive, is_uncertain, AiConfig, AiResponse,
    ChatRequest, PromptContext, QueryComplexity, Retriever, Source,
};
use crate::config::{
    ChatPrompts, LlmSettings, RagSettings, AI_DISABLED, UNCERTAIN_WITHOUT_HANDOVER,
    UNCERTAIN_WITH_HANDOVER,
};
use crate::llm::{ChatMessage, ChatModel, Completion, CompletionRequest};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const GREETING_CONFIDENCE: f32 = 0.95;
const DIRECT_CONFIDENCE: f32 = 0.7;
const UNCERTAIN_CONFIDENCE: f32 = 0.3;

/// Answers chat turns for widget agents.
pub struct RagEngine {
    retriever: Retriever,
    model: Arc<dyn ChatModel>,
    prompts: ChatPrompts,
    default_model: String,
    max_history: usize,
    preview_chars: usize,
}

impl RagEngine {
    pub fn new(retriever: Retriever, model: Arc<dyn ChatModel>) -> Self {
        let defaults = RagSettings::default();
        Self {
            retriever,
            model,
            prompts: ChatPrompts::default(),
            default_model: LlmSettings::default().model,
            max_history: defaults.max_history_turns,
            preview_chars: defaults.source_preview_chars,
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: ChatPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Model used when a request's `aiConfig` does not name one.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_settings(mut self, settings: &RagSettings) -> Self {
        self.max_history = settings.max_history_turns;
        self.preview_chars = settings.source_preview_chars;
        self
    }

    /// Answer one chat turn. Never fails; problems become a handoff response.
    #[instrument(skip(self, request), fields(widget_id = %request.widget_id, conversation_id = %request.conversation_id))]
    pub async fn respond(&self, request: &ChatRequest) -> AiResponse {
        let config = &request.ai_config;

        if !config.enabled {
            return AiResponse {
                success: false,
                response: AI_DISABLED.to_string(),
                confidence: 0.0,
                sources: Vec::new(),
                should_fallback_to_human: true,
                metadata: metadata([("reason", json!("ai_disabled"))]),
            };
        }

        let complexity = classify(&request.message);
        info!("Chat turn classified as {}", complexity);

        if complexity == QueryComplexity::Greeting {
            return self.respond_direct(request, GREETING_CONFIDENCE, true).await;
        }
        if !config.rag_enabled {
            return self.respond_direct(request, DIRECT_CONFIDENCE, false).await;
        }

        self.respond_grounded(request, complexity).await
    }

    async fn respond_direct(&self, request: &ChatRequest, confidence: f32, greeting: bool) -> AiResponse {
        let messages = build_messages(
            &self.prompts,
            &request.ai_config,
            PromptContext::Direct,
            &request.history,
            self.max_history,
            &request.message,
        );

        let completion = match self.complete(&request.ai_config, messages).await {
            Ok(completion) => completion,
            Err(response) => return response,
        };

        let mut meta = metadata([
            ("model", json!(completion.model)),
            ("agent_id", json!(request.widget_id)),
            ("rag_skipped", json!(true)),
        ]);
        if greeting {
            meta.insert("mode".to_string(), json!("conversational_direct"));
            meta.insert("greeting_detected".to_string(), json!(true));
        } else {
            meta.insert("mode".to_string(), json!("direct_openrouter"));
        }
        add_usage(&mut meta, &completion);

        AiResponse {
            success: true,
            response: completion.content,
            confidence,
            sources: Vec::new(),
            should_fallback_to_human: false,
            metadata: meta,
        }
    }

    async fn respond_grounded(&self, request: &ChatRequest, complexity: QueryComplexity) -> AiResponse {
        let config = &request.ai_config;
        let retrieval = self
            .retriever
            .retrieve(
                &request.message,
                &request.widget_id,
                complexity,
                config.max_retrieval_docs,
                config.reranker_enabled,
            )
            .await;

        let sources: Vec<Source> = retrieval
            .candidates
            .iter()
            .map(|c| Source::from_candidate(c, self.preview_chars))
            .collect();

        let messages = build_messages(
            &self.prompts,
            config,
            PromptContext::Knowledge(&retrieval.candidates),
            &request.history,
            self.max_history,
            &request.message,
        );

        let completion = match self.complete(config, messages).await {
            Ok(completion) => completion,
            Err(response) => return response,
        };

        let mut meta = metadata([
            ("mode", json!("rag_openrouter")),
            ("model", json!(completion.model)),
            ("sources_count", json!(sources.len())),
            ("agent_id", json!(request.widget_id)),
            ("complexity", json!(complexity)),
            ("candidates_requested", json!(retrieval.candidate_count)),
            ("reranked", json!(retrieval.reranked)),
        ]);
        if let Some(reason) = retrieval.skip_reason {
            meta.insert("rerank_skipped".to_string(), json!(reason));
        }
        add_usage(&mut meta, &completion);

        if is_substantive(&request.message) && is_uncertain(&completion.content) {
            let handover = request.customer_handover.clone().unwrap_or_default();
            let escalate = handover.smart_fallback();
            info!("Uncertain answer detected, handoff offered: {}", escalate);

            meta.insert("uncertainty_detected".to_string(), json!(true));
            return AiResponse {
                success: true,
                response: if escalate {
                    UNCERTAIN_WITH_HANDOVER
                } else {
                    UNCERTAIN_WITHOUT_HANDOVER
                }
                .to_string(),
                confidence: UNCERTAIN_CONFIDENCE,
                sources,
                should_fallback_to_human: escalate,
                metadata: meta,
            };
        }

        let confidence = confidence_score(&completion.content, &sources);
        let should_fallback_to_human =
            (confidence < config.confidence_threshold || sources.is_empty()) && config.fallback_to_human;

        AiResponse {
            success: true,
            response: completion.content,
            confidence,
            sources,
            should_fallback_to_human,
            metadata: meta,
        }
    }

    /// Run the completion, turning any failure into the error fallback response.
    async fn complete(
        &self,
        config: &AiConfig,
        messages: Vec<ChatMessage>,
    ) -> std::result::Result<Completion, AiResponse> {
        let model = config.model_or(&self.default_model);
        let request = CompletionRequest {
            model: model.to_string(),
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        self.model.complete(&request).await.map_err(|e| {
            warn!("Chat completion failed: {}", e);
            AiResponse::error_fallback(&e.to_string(), model)
        })
    }
}

fn metadata<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn add_usage(meta: &mut Map<String, Value>, completion: &Completion) {
    if let Some(usage) = completion.usage {
        meta.insert("usage".to_string(), json!(usage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ERROR_FALLBACK;
    use crate::llm::ResilientModel;
    use crate::rag::testing::{CountingEmbedder, ScriptedModel};
    use crate::rag::CustomerHandoverConfig;
    use crate::vector_store::{test_payload, MemoryVectorStore, Point, VectorStore};
    use std::time::Duration;

    struct Fixture {
        embedder: Arc<CountingEmbedder>,
        model: Arc<ScriptedModel>,
        engine: RagEngine,
    }

    async fn fixture(model: ScriptedModel, passages: &[&str]) -> Fixture {
        let store = Arc::new(MemoryVectorStore::new());
        let points: Vec<Point> = passages
            .iter()
            .enumerate()
            .map(|(i, text)| Point::new(vec![1.0, 0.2 * i as f32, 0.0], test_payload("w1", &format!("i{}", i), text)))
            .collect();
        store.upsert(&points).await.unwrap();

        let embedder = Arc::new(CountingEmbedder::new(vec![1.0, 0.0, 0.0]));
        let model = Arc::new(model);
        let engine = RagEngine::new(Retriever::new(Some(embedder.clone()), store), model.clone());

        Fixture { embedder, model, engine }
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            widget_id: "w1".to_string(),
            conversation_id: "c1".to_string(),
            ai_config: AiConfig::default(),
            business_id: Some("biz-1".to_string()),
            customer_name: None,
            customer_email: None,
            customer_handover: None,
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_model_selection() {
        let model = Arc::new(ScriptedModel::replying("Sure."));
        let store = Arc::new(MemoryVectorStore::new());
        let engine = RagEngine::new(Retriever::new(None, store), model.clone())
            .with_default_model("acme/custom-model");

        let mut unnamed = request("What are your opening hours?");
        unnamed.ai_config.rag_enabled = false;
        engine.respond(&unnamed).await;
        assert_eq!(model.last_request().unwrap().model, "acme/custom-model");

        let mut named = unnamed.clone();
        named.ai_config.model = Some("openai/gpt-4o-mini".to_string());
        engine.respond(&named).await;
        assert_eq!(model.last_request().unwrap().model, "openai/gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_greeting_skips_retrieval() {
        let f = fixture(ScriptedModel::replying("Hello! How can I help?"), &["Opening hours"]).await;

        for greeting in ["hello", "Hi there!", "thanks", "good morning"] {
            let response = f.engine.respond(&request(greeting)).await;
            assert!(response.success);
            assert_eq!(response.confidence, 0.95);
            assert!(response.sources.is_empty());
            assert_eq!(response.metadata["mode"], "conversational_direct");
            assert_eq!(response.metadata["rag_skipped"], true);
        }
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_grounded_answer() {
        let f = fixture(
            ScriptedModel::replying("We are open from 9am to 5pm on weekdays, and closed on public holidays."),
            &["Opening hours are 9am to 5pm.", "We are closed on public holidays."],
        )
        .await;

        let response = f.engine.respond(&request("What are your opening hours on weekdays?")).await;

        assert!(response.success);
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.metadata["mode"], "rag_openrouter");
        assert_eq!(response.metadata["sources_count"], 2);
        assert!((response.confidence - 0.8).abs() < 1e-4);
        assert!(!response.should_fallback_to_human);

        let sent = f.model.last_request().unwrap();
        assert_eq!(sent.model, LlmSettings::default().model);
        assert!(sent.messages[0].content.contains("Opening hours are 9am to 5pm."));
    }

    #[tokio::test]
    async fn test_no_sources_requests_handoff() {
        let f = fixture(ScriptedModel::replying("Let me check on that for you."), &[]).await;

        let response = f.engine.respond(&request("Do you deliver to Oslo?")).await;
        assert!(response.success);
        assert!(response.sources.is_empty());
        assert!(response.should_fallback_to_human);

        let mut no_handoff = request("Do you deliver to Oslo?");
        no_handoff.ai_config.fallback_to_human = false;
        assert!(!f.engine.respond(&no_handoff).await.should_fallback_to_human);
    }

    #[tokio::test]
    async fn test_uncertain_answer_with_handover() {
        let f = fixture(
            ScriptedModel::replying("I'm not sure about that from my current knowledge base."),
            &["Opening hours are 9am to 5pm."],
        )
        .await;

        let response = f.engine.respond(&request("Do you sell gift cards?")).await;
        assert_eq!(response.response, UNCERTAIN_WITH_HANDOVER);
        assert_eq!(response.confidence, 0.3);
        assert!(response.should_fallback_to_human);
        assert_eq!(response.metadata["uncertainty_detected"], true);

        let mut req = request("Do you sell gift cards?");
        req.customer_handover = Some(CustomerHandoverConfig {
            smart_fallback_enabled: false,
            ..CustomerHandoverConfig::default()
        });
        let response = f.engine.respond(&req).await;
        assert_eq!(response.response, UNCERTAIN_WITHOUT_HANDOVER);
        assert!(!response.should_fallback_to_human);
    }

    #[tokio::test]
    async fn test_rag_disabled_answers_directly() {
        let f = fixture(ScriptedModel::replying("Sure, happy to help."), &["Opening hours"]).await;

        let mut req = request("Can you tell me about your company?");
        req.ai_config.rag_enabled = false;
        let response = f.engine.respond(&req).await;

        assert!(response.success);
        assert_eq!(response.confidence, 0.7);
        assert_eq!(response.metadata["mode"], "direct_openrouter");
        assert_eq!(f.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_ai_disabled() {
        let f = fixture(ScriptedModel::replying("unused"), &[]).await;

        let mut req = request("Where is my order?");
        req.ai_config.enabled = false;
        let response = f.engine.respond(&req).await;

        assert!(!response.success);
        assert_eq!(response.response, "AI is disabled for this agent");
        assert!(response.should_fallback_to_human);
        assert_eq!(f.model.calls(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back() {
        let f = fixture(ScriptedModel::failing("rate limited"), &["Opening hours"]).await;

        let response = f.engine.respond(&request("What are your opening hours?")).await;
        assert!(!response.success);
        assert_eq!(response.response, ERROR_FALLBACK);
        assert!(response.should_fallback_to_human);
        assert!(response.metadata["error"].as_str().unwrap().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_llm_timeout_falls_back() {
        let slow: Arc<dyn ChatModel> = Arc::new(ScriptedModel::slow(Duration::from_secs(10)));
        let model = Arc::new(ResilientModel::new(slow, Duration::from_millis(50), 0));
        let store = Arc::new(MemoryVectorStore::new());
        let engine = RagEngine::new(Retriever::new(None, store), model);

        let started = std::time::Instant::now();
        let response = engine.respond(&request("What are your opening hours?")).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!response.success);
        assert!(response.should_fallback_to_human);
        assert!(response.metadata["error"].as_str().unwrap().contains("timed out"));
    }
}
