// crates/akave-mcp/src/gateway.rs
// ============================================================================
// Module: Storage Gateway
// Description: Typed facade over the object backend with input checks.
// Purpose: One method per storage operation with uniform error handling.
// Dependencies: akave-mcp-contract, akave-mcp::backend, akave-mcp::normalize
// ============================================================================

//! ## Overview
//! [`StorageGateway`] exclusively owns the backend handle and is the only path
//! from tool handlers to storage. It rejects empty identifiers before any
//! backend call, bounds signed URL lifetimes, normalizes object content on the
//! way out, and folds backend not-found results into the shapes the tools
//! expect (`None` for reads, success for deletes).
//!
//! ## Invariants
//! - Every mutation is a single direct backend call; nothing is queued or retried.
//! - Signed URL expiry is within `1..=604800` seconds; out-of-range values are
//!   rejected, never clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use akave_mcp_config::StorageConfig;
use akave_mcp_contract::DEFAULT_SIGNED_URL_EXPIRY_SECS;
use akave_mcp_contract::MAX_SIGNED_URL_EXPIRY_SECS;
use akave_mcp_contract::MIN_SIGNED_URL_EXPIRY_SECS;

use crate::backend::BucketLocation;
use crate::backend::BucketSummary;
use crate::backend::ObjectBackend;
use crate::backend::ObjectHeaders;
use crate::backend::ObjectLocation;
use crate::backend::ObjectSummary;
use crate::backend::StorageError;
use crate::backend::VersionListing;
use crate::normalize::content_type_for;
use crate::normalize::normalize_content;
use crate::s3::S3Backend;

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Typed storage facade shared by all tool calls.
#[derive(Clone)]
pub struct StorageGateway {
    /// Backend handle; shared immutably across in-flight calls.
    backend: Arc<dyn ObjectBackend>,
    /// Maximum object size relayed by `get_object`.
    max_object_bytes: usize,
}

impl StorageGateway {
    /// Wraps an existing backend.
    #[must_use]
    pub fn new(backend: Arc<dyn ObjectBackend>, max_object_bytes: usize) -> Self {
        Self {
            backend,
            max_object_bytes,
        }
    }

    /// Connects an S3 backend from storage configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when credentials are missing.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let backend = S3Backend::connect(config).await?;
        Ok(Self::new(Arc::new(backend), config.max_object_bytes))
    }

    /// Lists all buckets.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend fails.
    pub async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError> {
        self.backend.list_buckets().await
    }

    /// Lists the first page of objects in a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        require_bucket(bucket)?;
        self.backend.list_objects(bucket, prefix).await
    }

    /// Reads and normalizes object content; `None` when the object is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        let location = object_location(bucket, key)?;
        match self.backend.get_object(location, self.max_object_bytes).await {
            Ok(bytes) => Ok(Some(normalize_content(key, &bytes))),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Creates or overwrites an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn put_object(&self, bucket: &str, key: &str, body: &str) -> Result<(), StorageError> {
        let location = object_location(bucket, key)?;
        self.backend.put_object(location, body.as_bytes().to_vec(), content_type_for(key)).await
    }

    /// Overwrites an object; identical to [`Self::put_object`] (last writer wins).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn update_object(
        &self,
        bucket: &str,
        key: &str,
        body: &str,
    ) -> Result<(), StorageError> {
        self.put_object(bucket, key, body).await
    }

    /// Reads object headers without transferring the body.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for missing objects and other
    /// [`StorageError`] variants on backend failure.
    pub async fn fetch_headers(&self, bucket: &str, key: &str) -> Result<ObjectHeaders, StorageError> {
        self.backend.head_object(object_location(bucket, key)?).await
    }

    /// Deletes an object; deleting a missing object succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        match self.backend.delete_object(object_location(bucket, key)?).await {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Copies an existing object to a new location.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the source is missing.
    pub async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        destination_bucket: &str,
        destination_key: &str,
    ) -> Result<(), StorageError> {
        let source = object_location(source_bucket, source_key)?;
        let destination = object_location(destination_bucket, destination_key)?;
        self.backend.copy_object(source, destination).await
    }

    /// Creates a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        require_bucket(bucket)?;
        self.backend.create_bucket(bucket).await
    }

    /// Deletes a bucket; emptiness is enforced by the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        require_bucket(bucket)?;
        self.backend.delete_bucket(bucket).await
    }

    /// Returns the bucket location.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn get_bucket_location(&self, bucket: &str) -> Result<BucketLocation, StorageError> {
        require_bucket(bucket)?;
        self.backend.bucket_location(bucket).await
    }

    /// Lists object versions and delete markers (first page only).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when input is invalid or the backend fails.
    pub async fn list_object_versions(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<VersionListing, StorageError> {
        require_bucket(bucket)?;
        self.backend.list_object_versions(bucket, prefix).await
    }

    /// Issues a time-bounded read URL; object existence is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidInput`] when `expires_in` is out of range.
    pub async fn get_signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Option<u64>,
    ) -> Result<String, StorageError> {
        let location = object_location(bucket, key)?;
        let seconds = signed_url_expiry(expires_in)?;
        self.backend.presign_get(location, Duration::from_secs(seconds)).await
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Resolves and bounds a signed URL lifetime.
///
/// # Errors
///
/// Returns [`StorageError::InvalidInput`] when the value is out of range.
pub fn signed_url_expiry(expires_in: Option<u64>) -> Result<u64, StorageError> {
    let seconds = expires_in.unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS);
    if !(MIN_SIGNED_URL_EXPIRY_SECS ..= MAX_SIGNED_URL_EXPIRY_SECS).contains(&seconds) {
        return Err(StorageError::InvalidInput(format!(
            "expiresIn must be between {MIN_SIGNED_URL_EXPIRY_SECS} and \
             {MAX_SIGNED_URL_EXPIRY_SECS} seconds"
        )));
    }
    Ok(seconds)
}

/// Rejects empty bucket names.
fn require_bucket(bucket: &str) -> Result<(), StorageError> {
    if bucket.is_empty() {
        return Err(StorageError::InvalidInput("bucket must be non-empty".to_string()));
    }
    Ok(())
}

/// Builds a validated object location.
fn object_location<'a>(bucket: &'a str, key: &'a str) -> Result<ObjectLocation<'a>, StorageError> {
    require_bucket(bucket)?;
    if key.is_empty() {
        return Err(StorageError::InvalidInput("key must be non-empty".to_string()));
    }
    Ok(ObjectLocation {
        bucket,
        key,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
