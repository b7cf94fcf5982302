// crates/akave-mcp/src/backend.rs
// ============================================================================
// Module: Object Storage Backend
// Description: Backend abstraction and record shapes for S3-compatible storage.
// Purpose: Decouple the storage gateway from a concrete backend client.
// Dependencies: async-trait, aws-sdk-s3, serde
// ============================================================================

//! ## Overview
//! [`ObjectBackend`] is the seam between the storage gateway and the backend
//! service. The production implementation is [`crate::s3::S3Backend`]; tests
//! and local runs use [`crate::memory::InMemoryBackend`]. Implementations must
//! be safe for concurrent use by many in-flight tool calls and must report a
//! missing object as [`StorageError::NotFound`], never as a backend fault.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::primitives::DateTimeFormat;
use serde::Serialize;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Bucket listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    /// Bucket name.
    pub name: String,
    /// Creation timestamp (RFC 3339) when reported.
    pub creation_date: Option<String>,
}

/// Object listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: Option<i64>,
    /// Last-modified timestamp (RFC 3339) when reported.
    pub last_modified: Option<String>,
}

/// Object headers returned without transferring the body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHeaders {
    /// Content length in bytes.
    pub content_length: Option<i64>,
    /// Content type header.
    pub content_type: Option<String>,
    /// Last-modified timestamp (RFC 3339).
    pub last_modified: Option<String>,
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Version identifier when versioning is enabled.
    pub version_id: Option<String>,
    /// User-defined metadata.
    pub metadata: BTreeMap<String, String>,
}

/// Bucket location descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketLocation {
    /// Region label; the legacy empty constraint is reported as `us-east-1`.
    pub location: String,
}

/// Historical object version entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectVersion {
    /// Object key.
    pub key: String,
    /// Version identifier.
    pub version_id: Option<String>,
    /// Whether this is the current version.
    pub is_latest: bool,
    /// Version size in bytes.
    pub size: Option<i64>,
    /// Last-modified timestamp (RFC 3339).
    pub last_modified: Option<String>,
}

/// Delete marker entry in a version listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMarker {
    /// Object key.
    pub key: String,
    /// Version identifier of the marker.
    pub version_id: Option<String>,
    /// Whether the marker is the current version.
    pub is_latest: bool,
    /// Timestamp (RFC 3339) the marker was created.
    pub last_modified: Option<String>,
}

/// Version listing for a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionListing {
    /// Object versions.
    pub versions: Vec<ObjectVersion>,
    /// Delete markers.
    pub delete_markers: Vec<DeleteMarker>,
}

/// Fully-qualified object address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLocation<'a> {
    /// Bucket name.
    pub bucket: &'a str,
    /// Object key.
    pub key: &'a str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage errors surfaced by backends and the gateway.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Caller input rejected before reaching the backend.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Bucket does not exist.
    #[error("bucket not found: {0}")]
    NoSuchBucket(String),
    /// Object exceeds the relay size limit.
    #[error("object too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Object path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// Backend returned an error.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// Backend I/O failure.
    #[error("storage io error: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::NoSuchBucket(_) => "no_such_bucket",
            Self::TooLarge {
                ..
            } => "too_large",
            Self::Backend(_) => "backend",
            Self::Io(_) => "io",
        }
    }
}

// ============================================================================
// SECTION: Backend Trait
// ============================================================================

/// S3-compatible object storage operations.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Lists all buckets visible to the credentials.
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError>;

    /// Lists the first page of objects in a bucket.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError>;

    /// Reads an object body, failing when it exceeds `max_bytes`.
    async fn get_object(
        &self,
        location: ObjectLocation<'_>,
        max_bytes: usize,
    ) -> Result<Vec<u8>, StorageError>;

    /// Writes an object, overwriting any existing content.
    async fn put_object(
        &self,
        location: ObjectLocation<'_>,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Reads object headers without the body.
    async fn head_object(&self, location: ObjectLocation<'_>)
    -> Result<ObjectHeaders, StorageError>;

    /// Deletes an object.
    async fn delete_object(&self, location: ObjectLocation<'_>) -> Result<(), StorageError>;

    /// Copies an existing object to a new location.
    async fn copy_object(
        &self,
        source: ObjectLocation<'_>,
        destination: ObjectLocation<'_>,
    ) -> Result<(), StorageError>;

    /// Creates a bucket.
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Deletes a bucket; the backend rejects non-empty buckets.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Returns the bucket location.
    async fn bucket_location(&self, bucket: &str) -> Result<BucketLocation, StorageError>;

    /// Lists the first page of object versions and delete markers.
    async fn list_object_versions(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<VersionListing, StorageError>;

    /// Issues a presigned GET URL valid for `expires_in`.
    async fn presign_get(
        &self,
        location: ObjectLocation<'_>,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Formats a backend timestamp as RFC 3339.
#[must_use]
pub fn format_timestamp(value: &DateTime) -> Option<String> {
    value.fmt(DateTimeFormat::DateTime).ok()
}

/// Formats a system timestamp as RFC 3339.
#[must_use]
pub fn format_system_time(value: SystemTime) -> Option<String> {
    format_timestamp(&DateTime::from(value))
}
