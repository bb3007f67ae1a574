//! In-memory blob store for tests and local development.

use super::{object_key, Blob, BlobStore, Folder, StoredObject, UploadOwner};
use crate::error::{EngageError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local blob store. URLs point at the download endpoint.
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Blob>>,
    base_url: String,
}

impl MemoryBlobStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("/api/upload")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        folder: Folder,
        filename: &str,
        data: Vec<u8>,
        content_type: &str,
        _owner: &UploadOwner,
    ) -> Result<StoredObject> {
        let key = object_key(folder, filename);
        self.objects.write().await.insert(
            key.clone(),
            Blob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(StoredObject {
            url: format!("{}/{}", self.base_url, key),
            key,
            original_filename: filename.to_string(),
        })
    }

    async fn get(&self, key: &str) -> Result<Blob> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| EngageError::NotFound(format!("File {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
