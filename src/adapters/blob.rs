//! Object store construction
//!
//! Builds the object-store client used by `aws-s3` persistence descriptors
//! from [`BlobConfig`]. `None` means no client is configured.

use crate::config::{BlobBackend, BlobConfig};
use crate::domain::{GatewayError, Result};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::sync::Arc;

const BACKEND_NAME: &str = "blob";

/// Creates the configured object store
///
/// # Errors
///
/// Returns a configuration error if the backend cannot be initialised
/// (missing bucket, unusable root directory, invalid S3 settings).
pub fn build_object_store(config: &BlobConfig) -> Result<Option<Arc<dyn ObjectStore>>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        BlobBackend::None => return Ok(None),
        BlobBackend::Memory => Arc::new(InMemory::new()),
        BlobBackend::Local => {
            let root = config.root.as_deref().ok_or_else(|| {
                GatewayError::Configuration("persistence.blob.root is not set".to_string())
            })?;
            std::fs::create_dir_all(root).map_err(|e| {
                GatewayError::Configuration(format!("cannot create blob root '{root}': {e}"))
            })?;
            let store = LocalFileSystem::new_with_prefix(root).map_err(|e| {
                GatewayError::Configuration(format!("cannot open blob root '{root}': {e}"))
            })?;
            Arc::new(store)
        }
        BlobBackend::S3 => build_s3(config)?,
    };

    tracing::info!(backend = ?config.backend, store = %store, "Object store configured");
    Ok(Some(store))
}

fn build_s3(config: &BlobConfig) -> Result<Arc<dyn ObjectStore>> {
    let bucket = config.bucket.as_deref().ok_or_else(|| {
        GatewayError::Configuration("persistence.blob.bucket is not set".to_string())
    })?;

    let mut builder = AmazonS3Builder::from_env()
        .with_region(&config.region)
        .with_bucket_name(bucket)
        .with_allow_http(config.allow_http);

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }

    if let Some(access_key_id) = &config.access_key_id {
        builder = builder.with_access_key_id(access_key_id);
    }

    if let Some(secret_access_key) = &config.secret_access_key {
        builder = builder.with_secret_access_key(secret_access_key);
    }

    let store = builder.build().map_err(|e| {
        GatewayError::Configuration(format!(
            "failed to build {BACKEND_NAME} store for bucket '{bucket}': {e}"
        ))
    })?;

    Ok(Arc::new(store))
}
