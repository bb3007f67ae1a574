//! Configuration settings for Engage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub vector_store: VectorStoreSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub llm: LlmSettings,
    pub reranker: RerankerSettings,
    pub storage: StorageSettings,
    pub rag: RagSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Origins allowed by CORS. `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

/// Vector store provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Managed Qdrant over its REST API.
    #[default]
    Qdrant,
    /// Process-local store, for development and tests.
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(VectorStoreProvider::Qdrant),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Qdrant => write!(f, "qdrant"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (qdrant, memory).
    pub provider: VectorStoreProvider,
    /// Qdrant REST endpoint.
    pub url: String,
    /// Qdrant API key (Qdrant Cloud).
    pub api_key: Option<String>,
    /// Collection holding knowledge-base chunks.
    pub collection: String,
    /// Minimum similarity score for search hits.
    pub score_threshold: f32,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Qdrant,
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "rexa-engage".to_string(),
            score_threshold: 0.05,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAI,
    Voyage,
}

impl EmbeddingProvider {
    const ALL: [EmbeddingProvider; 2] = [EmbeddingProvider::OpenAI, EmbeddingProvider::Voyage];

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            EmbeddingProvider::OpenAI => "text-embedding-3-large",
            EmbeddingProvider::Voyage => "voyage-3-large",
        }
    }

    /// Vector size of the default model.
    pub fn default_dimensions(&self) -> u32 {
        match self {
            EmbeddingProvider::OpenAI => 3072,
            EmbeddingProvider::Voyage => 1024,
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAI),
            "voyage" | "voyageai" => Ok(EmbeddingProvider::Voyage),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::OpenAI => write!(f, "openai"),
            EmbeddingProvider::Voyage => write!(f, "voyage"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, voyage).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
    /// Voyage AI API key.
    pub voyage_api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: EmbeddingProvider::OpenAI.default_model().to_string(),
            dimensions: EmbeddingProvider::OpenAI.default_dimensions(),
            openai_api_key: None,
            voyage_api_key: None,
        }
    }
}

impl EmbeddingSettings {
    /// Replace another provider's default model (and its default size, if also left as is)
    /// with this provider's defaults. Explicitly chosen models are kept.
    pub fn apply_provider_defaults(&mut self) {
        for other in EmbeddingProvider::ALL.iter().filter(|p| **p != self.provider) {
            if self.model == other.default_model() {
                self.model = self.provider.default_model().to_string();
                if self.dimensions == other.default_dimensions() {
                    self.dimensions = self.provider.default_dimensions();
                }
            }
        }
    }
}

/// Text splitting settings for knowledge items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 300,
        }
    }
}

/// LLM completion settings (OpenRouter or any OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the chat completion API.
    pub base_url: String,
    /// API key for the completion API.
    pub api_key: Option<String>,
    /// Default model when a request does not name one.
    pub model: String,
    /// Site URL sent as `HTTP-Referer` for OpenRouter rankings.
    pub site_url: String,
    /// Site name sent as `X-Title`.
    pub site_name: String,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            model: "deepseek/deepseek-chat-v3.1:free".to_string(),
            site_url: "https://ai-native-crm.vercel.app".to_string(),
            site_name: "Rexa Engage".to_string(),
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

/// Reranker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    /// Base URL of the rerank API.
    pub base_url: String,
    /// API key (defaults to the Voyage embedding key).
    pub api_key: Option<String>,
    /// Reranker model.
    pub model: String,
    /// Skip reranking when the top vector score reaches this value.
    pub skip_score_threshold: f32,
    /// Skip reranking when the top two vector scores differ by at least this much.
    pub skip_score_margin: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.voyageai.com/v1".to_string(),
            api_key: None,
            model: "rerank-2.5-lite".to_string(),
            skip_score_threshold: 0.7,
            skip_score_margin: 0.15,
            timeout_secs: 10,
        }
    }
}

/// Object storage settings (Cloudflare R2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// R2 account ID, used to derive the endpoint.
    pub account_id: Option<String>,
    /// Access key ID.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Bucket name.
    pub bucket: String,
    /// Public base URL (custom domain) for stored objects.
    pub public_url: Option<String>,
    /// Explicit S3 endpoint, overriding the one derived from the account ID.
    pub endpoint: Option<String>,
    /// Maximum accepted image upload size in bytes.
    pub max_image_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            account_id: None,
            access_key_id: None,
            secret_access_key: None,
            bucket: "rexa-documents".to_string(),
            public_url: None,
            endpoint: None,
            max_image_bytes: 1024 * 1024,
        }
    }
}

impl StorageSettings {
    /// The S3 endpoint, if enough is configured to derive one.
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.account_id
                .as_ref()
                .filter(|id| !id.is_empty())
                .map(|id| format!("https://{}.r2.cloudflarestorage.com", id))
        })
    }

    /// Whether credentials and an endpoint are present.
    pub fn is_configured(&self) -> bool {
        self.endpoint_url().is_some()
            && self.access_key_id.as_ref().is_some_and(|k| !k.is_empty())
            && self.secret_access_key.as_ref().is_some_and(|k| !k.is_empty())
    }
}

/// RAG pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Prior conversation turns forwarded to the LLM.
    pub max_history_turns: usize,
    /// Characters of each source passage returned to the client.
    pub source_preview_chars: usize,
    /// Directory holding a custom `chat.toml` prompt file.
    pub prompts_dir: Option<String>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            max_history_turns: 20,
            source_preview_chars: 200,
            prompts_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file, then apply the environment.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables take precedence over the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = var("ALLOWED_ORIGINS") {
            for origin in origins.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                if !self.server.allowed_origins.iter().any(|o| o == origin) {
                    self.server.allowed_origins.push(origin.to_string());
                }
            }
        }

        if let Some(provider) = var("VECTOR_STORE_PROVIDER").and_then(|p| p.parse().ok()) {
            self.vector_store.provider = provider;
        }
        if let Some(url) = var("QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Some(key) = var("QDRANT_API_KEY") {
            self.vector_store.api_key = Some(key);
        }
        if let Some(collection) = var("QDRANT_COLLECTION_NAME") {
            self.vector_store.collection = collection;
        }

        if let Some(provider) = var("EMBEDDING_PROVIDER").and_then(|p| p.parse().ok()) {
            self.embedding.provider = provider;
        }
        if let Some(model) = var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dims) = var("EMBEDDING_DIMENSIONS").and_then(|d| d.parse().ok()) {
            self.embedding.dimensions = dims;
        }
        self.embedding.apply_provider_defaults();
        if let Some(key) = var("OPENAI_API_KEY") {
            self.embedding.openai_api_key = Some(key);
        }
        if let Some(key) = var("VOYAGE_API_KEY") {
            self.embedding.voyage_api_key = Some(key.clone());
            if self.reranker.api_key.is_none() {
                self.reranker.api_key = Some(key);
            }
        }
        if let Some(model) = var("RERANKER_MODEL") {
            self.reranker.model = model;
        }

        if let Some(key) = var("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = var("OPENROUTER_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(url) = var("OPENROUTER_SITE_URL") {
            self.llm.site_url = url;
        }
        if let Some(name) = var("OPENROUTER_SITE_NAME") {
            self.llm.site_name = name;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(secs) = var("LLM_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.llm.timeout_secs = secs;
        }
        if let Some(retries) = var("LLM_MAX_RETRIES").and_then(|s| s.parse().ok()) {
            self.llm.max_retries = retries;
        }

        if let Some(id) = var("R2_ACCOUNT_ID") {
            self.storage.account_id = Some(id);
        }
        if let Some(key) = var("R2_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(key);
        }
        if let Some(secret) = var("R2_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(secret);
        }
        if let Some(bucket) = var("R2_BUCKET_NAME") {
            self.storage.bucket = bucket;
        }
        if let Some(url) = var("R2_PUBLIC_URL") {
            self.storage.public_url = Some(url.trim_end_matches('/').to_string());
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::EngageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("engage")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Socket address string for the HTTP server.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// A copy with every secret masked, safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for secret in [
            &mut copy.vector_store.api_key,
            &mut copy.embedding.openai_api_key,
            &mut copy.embedding.voyage_api_key,
            &mut copy.llm.api_key,
            &mut copy.reranker.api_key,
            &mut copy.storage.access_key_id,
            &mut copy.storage.secret_access_key,
        ] {
            if let Some(value) = secret.as_mut() {
                *value = mask_secret(value);
            }
        }
        copy
    }
}

/// Mask all but the first and last few characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8001);
        assert_eq!(settings.chunking.chunk_size, 1500);
        assert_eq!(settings.chunking.chunk_overlap, 300);
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.llm.max_retries, 1);
        assert!((settings.reranker.skip_score_threshold - 0.7).abs() < f32::EPSILON);
        assert!((settings.reranker.skip_score_margin - 0.15).abs() < f32::EPSILON);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(lookup(&[
            ("PORT", "9000"),
            ("QDRANT_URL", "https://qdrant.example:6333"),
            ("QDRANT_COLLECTION_NAME", "kb"),
            ("EMBEDDING_PROVIDER", "voyage"),
            ("VOYAGE_API_KEY", "pa-secret"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("LLM_TIMEOUT_SECS", "5"),
        ]));

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.vector_store.url, "https://qdrant.example:6333");
        assert_eq!(settings.vector_store.collection, "kb");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Voyage);
        assert_eq!(settings.embedding.model, "voyage-3-large");
        assert_eq!(settings.embedding.dimensions, 1024);
        assert_eq!(settings.reranker.api_key.as_deref(), Some("pa-secret"));
        assert!(settings
            .server
            .allowed_origins
            .contains(&"https://b.example".to_string()));
        assert_eq!(settings.llm.timeout_secs, 5);
    }

    #[test]
    fn test_embedding_provider_defaults() {
        let mut settings = Settings::default();
        settings.apply_env(lookup(&[("EMBEDDING_PROVIDER", "voyage"), ("EMBEDDING_DIMENSIONS", "512")]));
        assert_eq!(settings.embedding.model, "voyage-3-large");
        assert_eq!(settings.embedding.dimensions, 512);

        let mut settings = Settings::default();
        settings.apply_env(lookup(&[
            ("EMBEDDING_PROVIDER", "voyage"),
            ("EMBEDDING_MODEL", "voyage-3.5"),
            ("EMBEDDING_DIMENSIONS", "2048"),
        ]));
        assert_eq!(settings.embedding.model, "voyage-3.5");
        assert_eq!(settings.embedding.dimensions, 2048);

        let mut settings = Settings::default();
        settings.apply_env(lookup(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(settings.embedding.model, "text-embedding-3-large");
        assert_eq!(settings.embedding.dimensions, 3072);
    }

    #[test]
    fn test_voyage_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[embedding]\nprovider = \"voyage\"\n").unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Voyage);
        assert_eq!(settings.embedding.model, "voyage-3-large");
        assert_eq!(settings.embedding.dimensions, 1024);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(lookup(&[("PORT", "not-a-port"), ("EMBEDDING_PROVIDER", "nope")]));
        assert_eq!(settings.server.port, 8001);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::OpenAI);
    }

    #[test]
    fn test_storage_endpoint_from_account() {
        let mut storage = StorageSettings::default();
        assert!(!storage.is_configured());

        storage.account_id = Some("abc123".to_string());
        storage.access_key_id = Some("key".to_string());
        storage.secret_access_key = Some("secret".to_string());
        assert_eq!(
            storage.endpoint_url().as_deref(),
            Some("https://abc123.r2.cloudflarestorage.com")
        );
        assert!(storage.is_configured());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 7000\n\n[vector_store]\nprovider = \"memory\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.vector_store.provider, VectorStoreProvider::Memory);
        assert_eq!(settings.vector_store.collection, "rexa-engage");
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("sk-or-v1-0123456789abcdef".to_string());
        let redacted = settings.redacted();
        assert_eq!(redacted.llm.api_key.as_deref(), Some("sk-o...cdef"));
        assert_eq!(mask_secret("short"), "*****");
    }
}
