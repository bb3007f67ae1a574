//! Prompt templates for Engage.
//!
//! Prompts can be customized by placing a `chat.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Reply used when the model admits it cannot answer and a human can take over.
pub const UNCERTAIN_WITH_HANDOVER: &str = "I'm not sure about that from my current knowledge base. Would you like me to connect you with a human agent who can help you better?";

/// Reply used when the model admits it cannot answer and no handover is configured.
pub const UNCERTAIN_WITHOUT_HANDOVER: &str =
    "I'm not sure about that from my current knowledge base. Is there anything else I can help you with?";

/// Reply used when the completion call fails outright.
pub const ERROR_FALLBACK: &str = "I'm sorry, I encountered an error while processing your request. Please try again or contact support.";

/// Reply used when AI is switched off for an agent.
pub const AI_DISABLED: &str = "AI is disabled for this agent";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub chat: ChatPrompts,
}

/// Persona presets and the knowledge-base wrappers around them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub support: String,
    pub sales: String,
    pub booking: String,
    pub technical: String,
    pub general: String,
    /// Appended to the persona when passages were retrieved. Uses `{{context}}`.
    pub knowledge_base: String,
    /// Appended to the persona when retrieval produced nothing.
    pub no_context: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            support: "You are a friendly and helpful customer support assistant. Be warm, conversational, and patient. Your goal is to make customers feel heard and help them solve their problems. Respond naturally like a real person would.".to_string(),
            sales: "You are an enthusiastic and knowledgeable sales assistant. Help customers discover the perfect products or services for their needs. Be conversational, highlight benefits naturally, and guide them through their buying journey with genuine care.".to_string(),
            booking: "You are a friendly booking assistant. Help customers schedule appointments and manage reservations in a warm, conversational way. Be clear about details but keep the conversation flowing naturally.".to_string(),
            technical: "You are a patient and helpful technical support specialist. Explain things clearly without being condescending. Use conversational language while staying precise. Make technical help feel human and approachable.".to_string(),
            general: "You are a versatile, friendly AI assistant. Adapt your personality to each conversation. Be warm with greetings, helpful with questions, and always conversational. Chat naturally like a real person would.".to_string(),

            knowledge_base: r#"You have access to a knowledge base with information relevant to the user's question.

===== KNOWLEDGE BASE =====
{{context}}
===== END OF KNOWLEDGE BASE =====

Rules:
1. Check the knowledge base first for any question that needs information.
2. If it contains relevant details, even partial ones, answer with them directly and specifically.
3. Only say "I'm not sure about that from my current knowledge base" when nothing in it relates to the question.
4. For greetings or casual conversation, respond naturally and do not mention the knowledge base."#
                .to_string(),

            no_context: r#"You currently don't have access to the knowledge base.

1. For greetings or casual conversation, respond warmly and ask how you can help.
2. For specific questions that need information, politely say: "I don't have access to my knowledge base at the moment. Let me connect you with a team member who can help you with that.""#
                .to_string(),
        }
    }
}

impl ChatPrompts {
    /// Persona text for a preset name. `custom` uses the supplied prompt when it is non-empty;
    /// unknown names fall back to `support`.
    pub fn persona<'a>(&'a self, preset: &str, custom: &'a str) -> &'a str {
        match preset {
            "custom" if !custom.trim().is_empty() => custom,
            "sales" => &self.sales,
            "booking" => &self.booking,
            "technical" => &self.technical,
            "general" => &self.general,
            _ => &self.support,
        }
    }
}

impl Prompts {
    /// Load prompts, overriding the defaults from an optional custom directory.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let chat_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_presets() {
        let prompts = ChatPrompts::default();
        assert!(prompts.persona("sales", "").contains("sales assistant"));
        assert!(prompts.persona("unknown", "").contains("customer support"));
        assert_eq!(prompts.persona("custom", "Be a pirate."), "Be a pirate.");
        assert!(prompts.persona("custom", "  ").contains("customer support"));
    }

    #[test]
    fn test_render_template() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "Opening hours: 9-5".to_string());

        let result = Prompts::render("KB:\n{{context}}\nEnd", &vars);
        assert_eq!(result, "KB:\nOpening hours: 9-5\nEnd");
    }

    #[test]
    fn test_load_custom_chat_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chat.toml"), "support = \"Keep it short.\"\n").unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.chat.support, "Keep it short.");
        assert!(prompts.chat.sales.contains("sales assistant"));
    }
}
