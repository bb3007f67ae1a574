//! Configuration module for Engage.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    ChatPrompts, Prompts, AI_DISABLED, ERROR_FALLBACK, UNCERTAIN_WITHOUT_HANDOVER,
    UNCERTAIN_WITH_HANDOVER,
};
pub use settings::{
    mask_secret, ChunkingSettings, EmbeddingProvider, EmbeddingSettings, LlmSettings,
    RagSettings, RerankerSettings, ServerSettings, Settings, StorageSettings,
    VectorStoreProvider, VectorStoreSettings,
};
