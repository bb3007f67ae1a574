//! Error types for Engage.

use thiserror::Error;

/// Library-level error type for Engage operations.
#[derive(Error, Debug)]
pub enum EngageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM request timed out after {0:?}")]
    LlmTimeout(std::time::Duration),

    #[error("Rerank failed: {0}")]
    Rerank(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Document processing failed: {0}")]
    Document(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

impl EngageError {
    /// Whether the error originated in an external service rather than in the request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            EngageError::Embedding(_)
                | EngageError::VectorStore(_)
                | EngageError::Llm(_)
                | EngageError::LlmTimeout(_)
                | EngageError::Rerank(_)
                | EngageError::Storage(_)
                | EngageError::Http(_)
                | EngageError::OpenAI(_)
        )
    }
}

/// Result type alias for Engage operations.
pub type Result<T> = std::result::Result<T, EngageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(EngageError::VectorStore("down".into()).is_upstream());
        assert!(EngageError::LlmTimeout(std::time::Duration::from_secs(30)).is_upstream());
        assert!(!EngageError::InvalidInput("bad".into()).is_upstream());
        assert!(!EngageError::NotFound("Review form".into()).is_upstream());
    }

    #[test]
    fn test_not_found_message() {
        let err = EngageError::NotFound("Review form".to_string());
        assert_eq!(err.to_string(), "Review form not found");
    }
}
