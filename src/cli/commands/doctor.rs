//! Doctor command - verify configuration and service connectivity.

use crate::cli::Output;
use crate::config::{mask_secret, EmbeddingProvider, Settings};
use crate::storage;
use crate::vector_store;
use console::style;
use std::path::PathBuf;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("Engage Doctor");
    println!();
    println!("Checking configuration and external services...\n");

    let mut checks = Vec::new();

    let config = vec![check_config_file(config_path)];
    print_section("Configuration", &config);
    checks.extend(config);

    let credentials = check_credentials(settings);
    print_section("API Keys", &credentials);
    checks.extend(credentials);

    let spinner = Output::spinner("Contacting services...");
    let services = vec![check_vector_store(settings).await, check_storage(settings).await];
    spinner.finish_and_clear();
    print_section("Services", &services);
    checks.extend(services);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. The server will start, but affected features are disabled.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Engage is ready to serve.");
    }

    Ok(())
}

fn check_config_file(config_path: Option<&PathBuf>) -> CheckResult {
    let path = config_path.cloned().unwrap_or_else(Settings::default_config_path);
    if path.exists() {
        CheckResult::ok("Config file", &path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults and environment",
            "Create with: engage config init",
        )
    }
}

fn check_key(name: &str, value: Option<&str>, missing: CheckStatus, hint: &str) -> CheckResult {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(key) => CheckResult::ok(name, &format!("configured ({})", mask_secret(key))),
        None if missing == CheckStatus::Error => CheckResult::error(name, "not set", hint),
        None => CheckResult::warning(name, "not set", hint),
    }
}

/// Check credentials for every external service.
fn check_credentials(settings: &Settings) -> Vec<CheckResult> {
    let embedding_key = match settings.embedding.provider {
        EmbeddingProvider::OpenAI => check_key(
            "OPENAI_API_KEY",
            settings.embedding.openai_api_key.as_deref(),
            CheckStatus::Error,
            "Required for knowledge-base embeddings. Set with: export OPENAI_API_KEY='sk-...'",
        ),
        EmbeddingProvider::Voyage => check_key(
            "VOYAGE_API_KEY",
            settings.embedding.voyage_api_key.as_deref(),
            CheckStatus::Error,
            "Required for Voyage embeddings. Set with: export VOYAGE_API_KEY='...'",
        ),
    };

    let storage = if settings.storage.is_configured() {
        CheckResult::ok("R2 credentials", &format!("bucket {}", settings.storage.bucket))
    } else {
        CheckResult::warning(
            "R2 credentials",
            "not set",
            "Uploads are disabled until R2_ACCOUNT_ID, R2_ACCESS_KEY_ID and R2_SECRET_ACCESS_KEY are set",
        )
    };

    vec![
        check_key(
            "OPENROUTER_API_KEY",
            settings.llm.api_key.as_deref(),
            CheckStatus::Error,
            "Chat answers fall back to human handoff without it",
        ),
        embedding_key,
        check_key(
            "Reranker key",
            settings.reranker.api_key.as_deref(),
            CheckStatus::Warning,
            "Set VOYAGE_API_KEY to enable reranking",
        ),
        storage,
    ]
}

async fn check_vector_store(settings: &Settings) -> CheckResult {
    let name = format!("Vector store ({})", settings.vector_store.url);
    let store = match vector_store::from_settings(&settings.vector_store) {
        Ok(store) => store,
        Err(e) => return CheckResult::error(&name, &e.to_string(), "Check QDRANT_URL"),
    };

    match store.health_check().await {
        Ok(()) => CheckResult::ok(&name, &format!("reachable, collection {}", settings.vector_store.collection)),
        Err(e) => CheckResult::error(&name, &e.to_string(), "Check QDRANT_URL and QDRANT_API_KEY"),
    }
}

async fn check_storage(settings: &Settings) -> CheckResult {
    let name = "Object storage";
    match storage::from_settings(&settings.storage).await {
        Ok(Some(store)) => match store.health_check().await {
            Ok(()) => CheckResult::ok(name, &format!("bucket {} reachable", settings.storage.bucket)),
            Err(e) => CheckResult::error(name, &e.to_string(), "Check R2 credentials and R2_BUCKET_NAME"),
        },
        Ok(None) => CheckResult::warning(name, "not configured", "Set the R2_* variables to enable uploads"),
        Err(e) => CheckResult::error(name, &e.to_string(), "Check R2 settings"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_key_masks_secret() {
        let result = check_key("KEY", Some("sk-abcdefghijklmnop"), CheckStatus::Error, "set it");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(!result.message.contains("abcdefghijkl"));
    }

    #[test]
    fn test_missing_keys() {
        let checks = check_credentials(&Settings::default());
        let openrouter = &checks[0];
        assert_eq!(openrouter.status, CheckStatus::Error);

        let reranker = checks.iter().find(|c| c.name == "Reranker key").unwrap();
        assert_eq!(reranker.status, CheckStatus::Warning);
    }
}
