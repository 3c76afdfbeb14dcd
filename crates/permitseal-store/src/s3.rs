//! S3-compatible file store.
//!
//! Supabase Storage (and MinIO, DigitalOcean Spaces, plain AWS S3) speak
//! the S3 protocol; this store drives them through `object_store` with an
//! optional custom endpoint. Each logical document bucket maps to its own
//! provider bucket.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use permitseal_core::BucketKind;

use crate::traits::{FileStore, StorageError, StorageResult, StoredFile};

/// S3-compatible implementation of [`FileStore`].
#[derive(Clone)]
pub struct S3FileStore {
    original: AmazonS3,
    processed: AmazonS3,
    region: String,
    endpoint_url: Option<String>,
}

impl S3FileStore {
    /// Create a new store with one provider bucket per logical bucket.
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible
    ///   providers (e.g., Supabase Storage's S3 endpoint, MinIO)
    ///
    /// Credentials come from the environment, as with any S3 client.
    pub fn new(region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        let original = Self::build_bucket(
            BucketKind::Original.bucket_name(),
            &region,
            endpoint_url.as_deref(),
        )?;
        let processed = Self::build_bucket(
            BucketKind::Processed.bucket_name(),
            &region,
            endpoint_url.as_deref(),
        )?;

        Ok(S3FileStore {
            original,
            processed,
            region,
            endpoint_url,
        })
    }

    fn build_bucket(
        bucket: &str,
        region: &str,
        endpoint_url: Option<&str>,
    ) -> StorageResult<AmazonS3> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.to_string())
            .with_bucket_name(bucket.to_string());

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.to_string())
                .with_allow_http(allow_http);
        }

        builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }

    fn store_for(&self, bucket: BucketKind) -> &AmazonS3 {
        match bucket {
            BucketKind::Original => &self.original,
            BucketKind::Processed => &self.processed,
        }
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Public URL for an object.
///
/// With a custom endpoint the path-style form `{endpoint}/{bucket}/{key}`
/// is used for provider compatibility; otherwise the standard AWS form.
fn public_url(endpoint: Option<&str>, region: &str, bucket: BucketKind, key: &str) -> String {
    if let Some(endpoint) = endpoint {
        format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            bucket.bucket_name(),
            key
        )
    } else {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            bucket.bucket_name(),
            region,
            key
        )
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn upload(
        &self,
        bucket: BucketKind,
        key: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredFile> {
        Self::validate_key(key)?;
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(key.to_string());

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store_for(bucket)
            .put(&location, PutPayload::from(bytes))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = bucket.bucket_name(),
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.file_url(bucket, key);

        tracing::info!(
            bucket = bucket.bucket_name(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(StoredFile {
            key: key.to_string(),
            url,
        })
    }

    async fn download(&self, bucket: BucketKind, key: &str) -> StorageResult<Vec<u8>> {
        Self::validate_key(key)?;
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = self.store_for(bucket).get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = bucket.bucket_name(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = bucket.bucket_name(),
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn delete(&self, bucket: BucketKind, key: &str) -> StorageResult<()> {
        Self::validate_key(key)?;
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = self.store_for(bucket).delete(&location).await;

        match result {
            Ok(()) => {
                tracing::info!(bucket = bucket.bucket_name(), key = %key, "S3 delete successful");
                Ok(())
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = bucket.bucket_name(),
                    key = %key,
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, bucket: BucketKind, key: &str) -> StorageResult<bool> {
        Self::validate_key(key)?;
        let location = Path::from(key.to_string());

        match self.store_for(bucket).head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn file_url(&self, bucket: BucketKind, key: &str) -> String {
        public_url(self.endpoint_url.as_deref(), &self.region, bucket, key)
    }
}
