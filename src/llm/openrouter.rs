//! OpenRouter chat completions through the OpenAI-compatible API.

use super::{ChatMessage, ChatModel, Completion, CompletionRequest, Role, TokenUsage};
use crate::config::LlmSettings;
use crate::error::{EngageError, Result};
use crate::openai::create_openrouter_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat model served by OpenRouter.
pub struct OpenRouterModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenRouterModel {
    /// Create a model client. Fails when no API key is configured.
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        Ok(Self {
            client: create_openrouter_client(settings)?,
        })
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let built: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(|e| EngageError::Llm(e.to_string()))?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(|e| EngageError::Llm(e.to_string()))?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(|e| EngageError::Llm(e.to_string()))?
            .into(),
    };
    Ok(built)
}

#[async_trait]
impl ChatModel for OpenRouterModel {
    // OpenRouter still reads `max_tokens` rather than `max_completion_tokens`.
    #[allow(deprecated)]
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let messages = request
            .messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| EngageError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| EngageError::OpenAI(format!("OpenRouter API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| EngageError::Llm("Empty response from LLM".to_string()))?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        debug!(
            "Completion from {} ({} chars, {:?} tokens)",
            response.model,
            content.len(),
            usage.map(|u| u.total_tokens)
        );

        Ok(Completion {
            content,
            model: response.model,
            usage,
        })
    }
}
