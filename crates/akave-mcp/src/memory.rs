// crates/akave-mcp/src/memory.rs
// ============================================================================
// Module: In-Memory Backend
// Description: Process-local object backend with S3-like semantics.
// Purpose: Exercise the gateway, router, and transports without a network.
// Dependencies: async-trait, std
// ============================================================================

//! ## Overview
//! [`InMemoryBackend`] keeps buckets and object histories behind a mutex and
//! mirrors the backend behaviors the bridge depends on: missing keys report
//! not-found, deletes of absent keys succeed, non-empty buckets refuse
//! deletion, and presigned URLs are unique per issuance. Versions are only
//! retained when the backend is built with [`InMemoryBackend::versioned`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use akave_mcp_config::DEFAULT_REGION;
use async_trait::async_trait;

use crate::backend::BucketLocation;
use crate::backend::BucketSummary;
use crate::backend::DeleteMarker;
use crate::backend::ObjectBackend;
use crate::backend::ObjectHeaders;
use crate::backend::ObjectLocation;
use crate::backend::ObjectSummary;
use crate::backend::ObjectVersion;
use crate::backend::StorageError;
use crate::backend::VersionListing;
use crate::backend::format_system_time;

// ============================================================================
// SECTION: State
// ============================================================================

/// Stored object revision.
#[derive(Debug, Clone)]
struct Revision {
    /// Revision identifier.
    version_id: String,
    /// Object body; `None` marks a delete marker.
    body: Option<Vec<u8>>,
    /// Content type header.
    content_type: Option<String>,
    /// Write timestamp.
    modified: SystemTime,
}

/// Stored bucket state.
#[derive(Debug, Clone)]
struct Bucket {
    /// Creation timestamp.
    created: SystemTime,
    /// Object revisions keyed by object key, oldest first.
    objects: BTreeMap<String, Vec<Revision>>,
}

impl Bucket {
    /// Returns the live revision for a key, skipping delete markers.
    fn current(&self, key: &str) -> Option<&Revision> {
        self.objects.get(key).and_then(|history| history.last()).filter(|rev| rev.body.is_some())
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// In-memory object backend.
pub struct InMemoryBackend {
    /// Buckets keyed by name.
    buckets: Mutex<BTreeMap<String, Bucket>>,
    /// Whether prior revisions are retained.
    versioned: bool,
    /// Monotonic counter for version ids and URL signatures.
    sequence: AtomicU64,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Creates an empty, unversioned backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            versioned: false,
            sequence: AtomicU64::new(1),
        }
    }

    /// Creates an empty backend that retains every revision.
    #[must_use]
    pub fn versioned() -> Self {
        Self {
            versioned: true,
            ..Self::new()
        }
    }

    /// Locks bucket state.
    fn state(&self) -> Result<MutexGuard<'_, BTreeMap<String, Bucket>>, StorageError> {
        self.buckets.lock().map_err(|_| StorageError::Io("memory backend poisoned".to_string()))
    }

    /// Allocates the next sequence value.
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Appends or replaces a revision according to the versioning mode.
    fn write_revision(&self, bucket: &mut Bucket, key: &str, revision: Revision) {
        let history = bucket.objects.entry(key.to_string()).or_default();
        if !self.versioned {
            history.clear();
        }
        history.push(revision);
    }
}

/// Looks up a bucket or reports it missing.
fn bucket_mut<'a>(
    state: &'a mut BTreeMap<String, Bucket>,
    name: &str,
) -> Result<&'a mut Bucket, StorageError> {
    state.get_mut(name).ok_or_else(|| StorageError::NoSuchBucket(name.to_string()))
}

/// Returns true when a key matches an optional prefix.
fn matches_prefix(key: &str, prefix: Option<&str>) -> bool {
    prefix.is_none_or(|prefix| key.starts_with(prefix))
}

/// Converts a byte length to the signed size used by S3 listings.
fn size_of(body: &[u8]) -> Option<i64> {
    i64::try_from(body.len()).ok()
}

#[async_trait]
impl ObjectBackend for InMemoryBackend {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError> {
        let state = self.state()?;
        Ok(state
            .iter()
            .map(|(name, bucket)| BucketSummary {
                name: name.clone(),
                creation_date: format_system_time(bucket.created),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let mut state = self.state()?;
        let bucket = bucket_mut(&mut state, bucket)?;
        let mut objects = Vec::new();
        for key in bucket.objects.keys().filter(|key| matches_prefix(key, prefix)) {
            if let Some(revision) = bucket.current(key)
                && let Some(body) = &revision.body
            {
                objects.push(ObjectSummary {
                    key: key.clone(),
                    size: size_of(body),
                    last_modified: format_system_time(revision.modified),
                });
            }
        }
        Ok(objects)
    }

    async fn get_object(
        &self,
        location: ObjectLocation<'_>,
        max_bytes: usize,
    ) -> Result<Vec<u8>, StorageError> {
        let mut state = self.state()?;
        let bucket = bucket_mut(&mut state, location.bucket)?;
        let body = bucket
            .current(location.key)
            .and_then(|revision| revision.body.clone())
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", location.bucket, location.key)))?;
        if body.len() > max_bytes {
            return Err(StorageError::TooLarge {
                path: format!("{}/{}", location.bucket, location.key),
                max_bytes,
                actual_bytes: body.len(),
            });
        }
        Ok(body)
    }

    async fn put_object(
        &self,
        location: ObjectLocation<'_>,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let version_id = format!("v{}", self.next_sequence());
        let mut state = self.state()?;
        let bucket = bucket_mut(&mut state, location.bucket)?;
        self.write_revision(
            bucket,
            location.key,
            Revision {
                version_id,
                body: Some(body),
                content_type: content_type.map(str::to_string),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn head_object(
        &self,
        location: ObjectLocation<'_>,
    ) -> Result<ObjectHeaders, StorageError> {
        let mut state = self.state()?;
        let bucket = bucket_mut(&mut state, location.bucket)?;
        let revision = bucket
            .current(location.key)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", location.bucket, location.key)))?;
        Ok(ObjectHeaders {
            content_length: revision.body.as_deref().and_then(size_of),
            content_type: revision.content_type.clone(),
            last_modified: format_system_time(revision.modified),
            e_tag: Some(format!("\"{}\"", revision.version_id)),
            version_id: self.versioned.then(|| revision.version_id.clone()),
            metadata: BTreeMap::new(),
        })
    }

    async fn delete_object(&self, location: ObjectLocation<'_>) -> Result<(), StorageError> {
        let version_id = format!("v{}", self.next_sequence());
        let mut state = self.state()?;
        let bucket = bucket_mut(&mut state, location.bucket)?;
        if bucket.current(location.key).is_none() {
            return Ok(());
        }
        if self.versioned {
            self.write_revision(
                bucket,
                location.key,
                Revision {
                    version_id,
                    body: None,
                    content_type: None,
                    modified: SystemTime::now(),
                },
            );
        } else {
            bucket.objects.remove(location.key);
        }
        Ok(())
    }

    async fn copy_object(
        &self,
        source: ObjectLocation<'_>,
        destination: ObjectLocation<'_>,
    ) -> Result<(), StorageError> {
        let version_id = format!("v{}", self.next_sequence());
        let mut state = self.state()?;
        let source_revision = bucket_mut(&mut state, source.bucket)?
            .current(source.key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", source.bucket, source.key)))?;
        let target = bucket_mut(&mut state, destination.bucket)?;
        self.write_revision(
            target,
            destination.key,
            Revision {
                version_id,
                modified: SystemTime::now(),
                ..source_revision
            },
        );
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut state = self.state()?;
        if state.contains_key(bucket) {
            return Err(StorageError::Backend(format!("BucketAlreadyOwnedByYou: {bucket}")));
        }
        state.insert(
            bucket.to_string(),
            Bucket {
                created: SystemTime::now(),
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut state = self.state()?;
        let entry = bucket_mut(&mut state, bucket)?;
        if entry.objects.values().any(|history| !history.is_empty()) {
            return Err(StorageError::Backend(format!(
                "BucketNotEmpty: the bucket you tried to delete is not empty: {bucket}"
            )));
        }
        state.remove(bucket);
        Ok(())
    }

    async fn bucket_location(&self, bucket: &str) -> Result<BucketLocation, StorageError> {
        let mut state = self.state()?;
        bucket_mut(&mut state, bucket)?;
        Ok(BucketLocation {
            location: DEFAULT_REGION.to_string(),
        })
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<VersionListing, StorageError> {
        let mut state = self.state()?;
        let bucket = bucket_mut(&mut state, bucket)?;
        let mut listing = VersionListing::default();
        if !self.versioned {
            return Ok(listing);
        }
        for (key, history) in bucket.objects.iter().filter(|(key, _)| matches_prefix(key, prefix))
        {
            let latest = history.len().saturating_sub(1);
            for (index, revision) in history.iter().enumerate().rev() {
                let is_latest = index == latest;
                let last_modified = format_system_time(revision.modified);
                let version_id = Some(revision.version_id.clone());
                match &revision.body {
                    Some(body) => listing.versions.push(ObjectVersion {
                        key: key.clone(),
                        version_id,
                        is_latest,
                        size: size_of(body),
                        last_modified,
                    }),
                    None => listing.delete_markers.push(DeleteMarker {
                        key: key.clone(),
                        version_id,
                        is_latest,
                        last_modified,
                    }),
                }
            }
        }
        Ok(listing)
    }

    async fn presign_get(
        &self,
        location: ObjectLocation<'_>,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let issued = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let expires_at = issued.saturating_add(expires_in).as_secs();
        let signature = self.next_sequence();
        Ok(format!(
            "memory://{}/{}?expires={expires_at}&issued={}&signature={signature:016x}",
            location.bucket,
            urlencoding::encode(location.key),
            issued.as_nanos(),
        ))
    }
}
