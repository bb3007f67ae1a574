//! HTTP and OpenAI-compatible client construction.

use crate::config::LlmSettings;
use crate::error::{EngageError, Result};
use async_openai::{config::OpenAIConfig, Client};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Connect timeout shared by all outbound HTTP clients.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default overall timeout for outbound requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Build a pooled reqwest client with a connect timeout and an overall timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    http_client_with_headers(timeout, HeaderMap::new())
}

fn http_client_with_headers(timeout: Duration, headers: HeaderMap) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| EngageError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create an OpenAI client for the given key.
pub fn create_client(api_key: &str) -> Result<Client<OpenAIConfig>> {
    let http = http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;
    let config = OpenAIConfig::new().with_api_key(api_key);
    Ok(Client::with_config(config).with_http_client(http))
}

/// Create an OpenAI-compatible client pointed at OpenRouter.
///
/// OpenRouter uses `HTTP-Referer` and `X-Title` to attribute traffic to the calling site.
pub fn create_openrouter_client(settings: &LlmSettings) -> Result<Client<OpenAIConfig>> {
    let api_key = settings
        .api_key
        .as_deref()
        .ok_or_else(|| EngageError::Config("OPENROUTER_API_KEY is not set".to_string()))?;

    let mut headers = HeaderMap::new();
    insert_header(&mut headers, "http-referer", &settings.site_url)?;
    insert_header(&mut headers, "x-title", &settings.site_name)?;

    let http = http_client_with_headers(Duration::from_secs(DEFAULT_TIMEOUT_SECS), headers)?;
    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(settings.base_url.trim_end_matches('/'));

    Ok(Client::with_config(config).with_http_client(http))
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let value = HeaderValue::from_str(value)
        .map_err(|e| EngageError::Config(format!("Invalid {} header: {}", name, e)))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}
