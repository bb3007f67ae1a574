//! Cloudflare R2 storage through the S3 API.

use super::{object_key, public_url, Blob, BlobStore, Folder, StoredObject, UploadOwner};
use crate::config::StorageSettings;
use crate::error::{EngageError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info, instrument};

/// R2 bucket client.
pub struct R2BlobStore {
    client: S3Client,
    settings: StorageSettings,
}

impl R2BlobStore {
    /// Connect to the configured bucket.
    pub async fn new(settings: &StorageSettings) -> Result<Self> {
        let endpoint = settings
            .endpoint_url()
            .ok_or_else(|| EngageError::Config("R2_ACCOUNT_ID is not set".to_string()))?;
        let access_key = settings
            .access_key_id
            .clone()
            .ok_or_else(|| EngageError::Config("R2_ACCESS_KEY_ID is not set".to_string()))?;
        let secret_key = settings
            .secret_access_key
            .clone()
            .ok_or_else(|| EngageError::Config("R2_SECRET_ACCESS_KEY is not set".to_string()))?;

        let base_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region("auto")
            .credentials_provider(Credentials::new(access_key, secret_key, None, None, "static"))
            .load()
            .await;

        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(true)
            .build();

        info!("R2 storage ready (bucket {})", settings.bucket);
        Ok(Self {
            client: S3Client::from_conf(s3_config),
            settings: settings.clone(),
        })
    }
}

#[async_trait]
impl BlobStore for R2BlobStore {
    #[instrument(skip(self, data, owner), fields(size = data.len()))]
    async fn put(
        &self,
        folder: Folder,
        filename: &str,
        data: Vec<u8>,
        content_type: &str,
        owner: &UploadOwner,
    ) -> Result<StoredObject> {
        let key = object_key(folder, filename);

        self.client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .set_metadata(Some(owner.metadata(filename)))
            .send()
            .await
            .map_err(|e| EngageError::Storage(format!("R2 upload failed: {}", e)))?;

        info!("Uploaded {} to R2", key);
        Ok(StoredObject {
            url: public_url(&self.settings, &key),
            key,
            original_filename: filename.to_string(),
        })
    }

    async fn get(&self, key: &str) -> Result<Blob> {
        let output = self
            .client
            .get_object()
            .bucket(&self.settings.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    EngageError::NotFound(format!("File {}", key))
                } else {
                    EngageError::Storage(format!("R2 download failed: {}", e))
                }
            })?;

        let content_type = output
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| EngageError::Storage(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} ({} bytes)", key, data.len());
        Ok(Blob { data, content_type })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.settings.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| EngageError::Storage(format!("R2 delete failed: {}", e)))?;
        info!("Deleted {} from R2", key);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.settings.bucket)
            .send()
            .await
            .map_err(|e| EngageError::Storage(format!("R2 bucket unreachable: {}", e)))?;
        Ok(())
    }
}
