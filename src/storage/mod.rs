//! Object storage for uploaded documents and images.

mod memory;
mod r2;

pub use memory::MemoryBlobStore;
pub use r2::R2BlobStore;

use crate::config::StorageSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Where a stored object ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub original_filename: String,
}

/// A downloaded object.
#[derive(Debug, Clone)]
pub struct Blob {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Top-level key prefix separating archived knowledge documents from widget images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Documents,
    Images,
}

impl Folder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Documents => "documents",
            Folder::Images => "images",
        }
    }

    /// Whether `key` lives directly under this folder.
    pub fn contains(&self, key: &str) -> bool {
        key.strip_prefix(self.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
    }
}

/// Who an upload belongs to, recorded as object metadata.
#[derive(Debug, Clone, Default)]
pub struct UploadOwner {
    pub workspace_id: Option<String>,
    pub agent_id: Option<String>,
}

impl UploadOwner {
    fn metadata(&self, original_filename: &str) -> HashMap<String, String> {
        HashMap::from([
            ("original_filename".to_string(), original_filename.to_string()),
            ("workspace_id".to_string(), self.workspace_id.clone().unwrap_or_default()),
            ("agent_id".to_string(), self.agent_id.clone().unwrap_or_default()),
            ("uploaded_at".to_string(), chrono::Utc::now().to_rfc3339()),
        ])
    }
}

/// Trait for blob storage backends.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under a freshly generated key in `folder`, derived from `filename`.
    async fn put(
        &self,
        folder: Folder,
        filename: &str,
        data: Vec<u8>,
        content_type: &str,
        owner: &UploadOwner,
    ) -> Result<StoredObject>;

    /// Fetch an object. Unknown keys yield `NotFound`.
    async fn get(&self, key: &str) -> Result<Blob>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check that the bucket is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Build the R2 store, or `None` when credentials are missing.
pub async fn from_settings(settings: &StorageSettings) -> Result<Option<Arc<dyn BlobStore>>> {
    if !settings.is_configured() {
        return Ok(None);
    }
    Ok(Some(Arc::new(R2BlobStore::new(settings).await?)))
}

/// Generate a collision-free key under `folder`, keeping the file extension.
pub fn object_key(folder: Folder, filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("{}/{}{}", folder.as_str(), Uuid::new_v4().simple(), extension)
}

/// Public URL for a key: the custom domain when set, else the bucket's R2 host.
pub fn public_url(settings: &StorageSettings, key: &str) -> String {
    match settings.public_url.as_deref().filter(|u| !u.is_empty()) {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!(
            "https://{}.{}.r2.cloudflarestorage.com/{}",
            settings.bucket,
            settings.account_id.as_deref().unwrap_or_default(),
            key
        ),
    }
}
