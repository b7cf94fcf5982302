// crates/akave-mcp/src/s3.rs
// ============================================================================
// Module: S3 Backend
// Description: aws-sdk-s3 implementation of the object backend.
// Purpose: Reach Akave (or any S3-compatible endpoint) with static credentials.
// Dependencies: aws-config, aws-sdk-s3, tokio, urlencoding
// ============================================================================

//! ## Overview
//! [`S3Backend`] wraps a shared [`aws_sdk_s3::Client`] configured from the
//! resolved storage credentials with path-style addressing. The client is
//! cheap to clone and safe for concurrent use. Backend faults are classified
//! so that missing objects and buckets never surface as generic errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::time::Duration;

use akave_mcp_config::DEFAULT_REGION;
use akave_mcp_config::StorageConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::BucketLocationConstraint;
use aws_sdk_s3::types::CreateBucketConfiguration;
use tokio::io::AsyncReadExt;

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
use crate::backend::format_timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provider name attached to the static credentials.
const CREDENTIALS_PROVIDER_NAME: &str = "akave-static";
/// Read buffer size for streaming object bodies.
const READ_CHUNK_BYTES: usize = 8192;
/// Error codes reported for a missing object.
const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NotFound", "NoSuchVersion"];

// ============================================================================
// SECTION: S3 Backend
// ============================================================================

/// S3-compatible backend over `aws-sdk-s3`.
#[derive(Clone)]
pub struct S3Backend {
    /// Underlying S3 client.
    client: Client,
    /// Signing region, used for bucket location constraints.
    region: String,
}

impl S3Backend {
    /// Builds a backend from validated storage configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidInput`] when credentials are missing.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let credentials =
            config.credentials().map_err(|err| StorageError::InvalidInput(err.to_string()))?;
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(credentials.endpoint.clone())
            .credentials_provider(Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ))
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(builder.build()),
            region: config.region.clone(),
        })
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError> {
        let output = self.client.list_buckets().send().await.map_err(|err| classify(err, ""))?;
        Ok(output
            .buckets()
            .iter()
            .map(|bucket| BucketSummary {
                name: bucket.name().unwrap_or_default().to_string(),
                creation_date: bucket.creation_date().and_then(format_timestamp),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(prefix.map(str::to_string))
            .send()
            .await
            .map_err(|err| classify(err, bucket))?;
        Ok(output
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size(),
                last_modified: object.last_modified().and_then(format_timestamp),
            })
            .collect())
    }

    async fn get_object(
        &self,
        location: ObjectLocation<'_>,
        max_bytes: usize,
    ) -> Result<Vec<u8>, StorageError> {
        let path = object_path(location);
        let output = self
            .client
            .get_object()
            .bucket(location.bucket)
            .key(location.key)
            .send()
            .await
            .map_err(|err| classify(err, &path))?;
        if let Some(length) = output.content_length() {
            let actual_bytes = usize::try_from(length).unwrap_or(usize::MAX);
            if actual_bytes > max_bytes {
                return Err(StorageError::TooLarge {
                    path,
                    max_bytes,
                    actual_bytes,
                });
            }
        }
        let mut reader = output.body.into_async_read();
        let mut buffer = Vec::new();
        let mut total_bytes = 0usize;
        let mut chunk = [0u8; READ_CHUNK_BYTES];
        loop {
            let read =
                reader.read(&mut chunk).await.map_err(|err| StorageError::Io(err.to_string()))?;
            if read == 0 {
                break;
            }
            total_bytes = total_bytes
                .checked_add(read)
                .ok_or_else(|| StorageError::Io("object size overflow".to_string()))?;
            if total_bytes > max_bytes {
                return Err(StorageError::TooLarge {
                    path,
                    max_bytes,
                    actual_bytes: total_bytes,
                });
            }
            buffer.extend_from_slice(&chunk[.. read]);
        }
        Ok(buffer)
    }

    async fn put_object(
        &self,
        location: ObjectLocation<'_>,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(location.bucket)
            .key(location.key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|err| classify(err, &object_path(location)))?;
        Ok(())
    }

    async fn head_object(
        &self,
        location: ObjectLocation<'_>,
    ) -> Result<ObjectHeaders, StorageError> {
        let output = self
            .client
            .head_object()
            .bucket(location.bucket)
            .key(location.key)
            .send()
            .await
            .map_err(|err| classify(err, &object_path(location)))?;
        let metadata: BTreeMap<String, String> = output
            .metadata()
            .map(|values| values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Ok(ObjectHeaders {
            content_length: output.content_length(),
            content_type: output.content_type().map(str::to_string),
            last_modified: output.last_modified().and_then(format_timestamp),
            e_tag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
            metadata,
        })
    }

    async fn delete_object(&self, location: ObjectLocation<'_>) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(location.bucket)
            .key(location.key)
            .send()
            .await
            .map_err(|err| classify(err, &object_path(location)))?;
        Ok(())
    }

    async fn copy_object(
        &self,
        source: ObjectLocation<'_>,
        destination: ObjectLocation<'_>,
    ) -> Result<(), StorageError> {
        let copy_source = format!("{}/{}", source.bucket, urlencoding::encode(source.key));
        self.client
            .copy_object()
            .copy_source(copy_source)
            .bucket(destination.bucket)
            .key(destination.key)
            .send()
            .await
            .map_err(|err| classify(err, &object_path(source)))?;
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request.send().await.map_err(|err| classify(err, bucket))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| classify(err, bucket))?;
        Ok(())
    }

    async fn bucket_location(&self, bucket: &str) -> Result<BucketLocation, StorageError> {
        let output = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| classify(err, bucket))?;
        let location = output
            .location_constraint()
            .map(BucketLocationConstraint::as_str)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string();
        Ok(BucketLocation {
            location,
        })
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<VersionListing, StorageError> {
        let output = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .set_prefix(prefix.map(str::to_string))
            .send()
            .await
            .map_err(|err| classify(err, bucket))?;
        let versions = output
            .versions()
            .iter()
            .map(|version| ObjectVersion {
                key: version.key().unwrap_or_default().to_string(),
                version_id: version.version_id().map(str::to_string),
                is_latest: version.is_latest().unwrap_or(false),
                size: version.size(),
                last_modified: version.last_modified().and_then(format_timestamp),
            })
            .collect();
        let delete_markers = output
            .delete_markers()
            .iter()
            .map(|marker| DeleteMarker {
                key: marker.key().unwrap_or_default().to_string(),
                version_id: marker.version_id().map(str::to_string),
                is_latest: marker.is_latest().unwrap_or(false),
                last_modified: marker.last_modified().and_then(format_timestamp),
            })
            .collect();
        Ok(VersionListing {
            versions,
            delete_markers,
        })
    }

    async fn presign_get(
        &self,
        location: ObjectLocation<'_>,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StorageError::InvalidInput(err.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(location.bucket)
            .key(location.key)
            .presigned(presigning)
            .await
            .map_err(|err| classify(err, &object_path(location)))?;
        Ok(request.uri().to_string())
    }
}

// ============================================================================
// SECTION: Error Classification
// ============================================================================

/// Maps an SDK error onto the storage error taxonomy.
fn classify<E>(error: SdkError<E, HttpResponse>, subject: &str) -> StorageError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
{
    let status = error.raw_response().map(|response| response.status().as_u16());
    let code = error.code().map(str::to_string);
    if code.as_deref() == Some("NoSuchBucket") {
        return StorageError::NoSuchBucket(subject.to_string());
    }
    if code.as_deref().is_some_and(|code| NOT_FOUND_CODES.contains(&code)) || status == Some(404)
    {
        return StorageError::NotFound(subject.to_string());
    }
    match (code, error.message().map(str::to_string)) {
        (Some(code), Some(message)) => StorageError::Backend(format!("{code}: {message}")),
        (Some(code), None) => StorageError::Backend(code),
        _ => StorageError::Backend(DisplayErrorContext(&error).to_string()),
    }
}

/// Renders `bucket/key` for diagnostics.
fn object_path(location: ObjectLocation<'_>) -> String {
    format!("{}/{}", location.bucket, location.key)
}
