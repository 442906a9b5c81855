//! S3-compatible object store (MinIO, AWS) via rust-s3

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::storage::ObjectStore;
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::info;

pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    name: String,
    region: Region,
    credentials: Credentials,
}

impl S3ObjectStore {
    /// Build a client for the configured bucket; no network traffic yet
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = match config.endpoint_url.as_deref() {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::ObjectStore(format!("invalid region: {}", e)))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::ObjectStore(format!("invalid credentials: {}", e)))?;

        let bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())?
            .with_path_style();

        Ok(Self {
            bucket,
            name: config.bucket.clone(),
            region,
            credentials,
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn backend(&self) -> &'static str {
        "s3"
    }

    fn bucket(&self) -> &str {
        &self.name
    }

    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        if self.bucket.exists().await? {
            info!(bucket = %self.name, "Bucket already exists");
            return Ok(());
        }

        Bucket::create_with_path_style(
            &self.name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await?;
        info!(bucket = %self.name, "Bucket created");
        Ok(())
    }

    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, body, content_type)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_custom_endpoint_uses_path_style() {
        let mut config = AppConfig::default().storage;
        config.endpoint_url = Some("http://minio:9000/".into());
        config.access_key = Some("minio".into());
        config.secret_key = Some("minio123".into());

        let store = S3ObjectStore::new(&config).unwrap();
        assert_eq!(store.bucket(), "dados-analise");
        assert_eq!(store.backend(), "s3");
        assert!(store.bucket.is_path_style());
        assert_eq!(store.region.endpoint(), "http://minio:9000");
    }
}
