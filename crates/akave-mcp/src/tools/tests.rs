// crates/akave-mcp/src/tools/tests.rs
// ============================================================================
// Module: Tool Router Tests
// Description: Unit tests for argument validation and tool dispatch.
// Purpose: Verify schema gating, not-found shaping, and result payloads.
// Dependencies: akave-mcp::memory, tokio
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions use unwraps and panics for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use super::SignedUrlRequest;
use super::ToolError;
use super::ToolOutput;
use super::ToolRouter;
use super::ToolRouterConfig;
use super::decode;
use crate::backend::BucketLocation;
use crate::backend::BucketSummary;
use crate::backend::ObjectBackend;
use crate::backend::ObjectHeaders;
use crate::backend::ObjectLocation;
use crate::backend::ObjectSummary;
use crate::backend::StorageError;
use crate::backend::VersionListing;
use crate::gateway::StorageGateway;
use crate::memory::InMemoryBackend;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn router_with(backend: Arc<dyn ObjectBackend>, request_timeout_ms: u64) -> ToolRouter {
    ToolRouter::new(
        StorageGateway::new(backend, 1024 * 1024),
        ToolRouterConfig {
            request_timeout_ms,
        },
    )
    .unwrap()
}

fn router() -> ToolRouter {
    router_with(Arc::new(InMemoryBackend::new()), 5_000)
}

async fn call(router: &ToolRouter, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
    router.handle_tool_call(name, arguments).await
}

/// Backend that counts calls and sleeps before answering.
struct CountingBackend {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingBackend {
    fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    async fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
    }
}

#[async_trait]
impl ObjectBackend for CountingBackend {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError> {
        self.touch().await;
        Ok(Vec::new())
    }

    async fn list_objects(
        &self,
        _bucket: &str,
        _prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        self.touch().await;
        Ok(Vec::new())
    }

    async fn get_object(
        &self,
        _location: ObjectLocation<'_>,
        _max_bytes: usize,
    ) -> Result<Vec<u8>, StorageError> {
        self.touch().await;
        Err(StorageError::NotFound("counted".to_string()))
    }

    async fn put_object(
        &self,
        _location: ObjectLocation<'_>,
        _body: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.touch().await;
        Ok(())
    }

    async fn head_object(
        &self,
        _location: ObjectLocation<'_>,
    ) -> Result<ObjectHeaders, StorageError> {
        self.touch().await;
        Ok(ObjectHeaders::default())
    }

    async fn delete_object(&self, _location: ObjectLocation<'_>) -> Result<(), StorageError> {
        self.touch().await;
        Ok(())
    }

    async fn copy_object(
        &self,
        _source: ObjectLocation<'_>,
        _destination: ObjectLocation<'_>,
    ) -> Result<(), StorageError> {
        self.touch().await;
        Ok(())
    }

    async fn create_bucket(&self, _bucket: &str) -> Result<(), StorageError> {
        self.touch().await;
        Ok(())
    }

    async fn delete_bucket(&self, _bucket: &str) -> Result<(), StorageError> {
        self.touch().await;
        Ok(())
    }

    async fn bucket_location(&self, _bucket: &str) -> Result<BucketLocation, StorageError> {
        self.touch().await;
        Ok(BucketLocation {
            location: "us-east-1".to_string(),
        })
    }

    async fn list_object_versions(
        &self,
        _bucket: &str,
        _prefix: Option<&str>,
    ) -> Result<VersionListing, StorageError> {
        self.touch().await;
        Ok(VersionListing::default())
    }

    async fn presign_get(
        &self,
        _location: ObjectLocation<'_>,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        self.touch().await;
        Ok("https://example.test/signed".to_string())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[tokio::test]
async fn unknown_tool_is_rejected() {
    let err = call(&router(), "rename_object", json!({})).await.unwrap_err();
    assert!(matches!(err, ToolError::UnknownTool(ref name) if name == "rename_object"));
}

#[tokio::test]
async fn schema_violations_never_reach_backend() {
    let backend = Arc::new(CountingBackend::new(Duration::ZERO));
    let router = router_with(backend.clone(), 5_000);
    let cases = [
        ("get_object", json!({"bucket": "b"})),
        ("get_object", json!({"bucket": "", "key": "k"})),
        ("put_object", json!({"bucket": "b", "key": "k", "body": 5})),
        ("list_buckets", json!({"unexpected": true})),
        ("get_signed_url", json!({"bucket": "b", "key": "k", "expiresIn": 0})),
        ("get_signed_url", json!({"bucket": "b", "key": "k", "expiresIn": -10})),
        ("copy_object", json!({"sourceBucket": "a", "sourceKey": "k"})),
        ("create_bucket", json!("not-an-object")),
    ];
    for (name, arguments) in cases {
        let err = call(&router, name, arguments).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)), "{name}: {err}");
        assert!(err.to_string().starts_with("schema violation"));
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn null_arguments_are_treated_as_empty_object() {
    let output = call(&router(), "list_buckets", Value::Null).await.unwrap();
    assert_eq!(output, ToolOutput::Json(json!([])));
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

#[tokio::test]
async fn get_object_missing_reports_not_found() {
    let router = router();
    call(&router, "create_bucket", json!({"bucket": "b"})).await.unwrap();
    let err = call(&router, "get_object", json!({"bucket": "b", "key": "nope.txt"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
    assert_eq!(err.to_string(), "Object not found");
}

#[tokio::test]
async fn mutations_acknowledge_with_success_flag() {
    let router = router();
    let output = call(&router, "create_bucket", json!({"bucket": "b"})).await.unwrap();
    assert_eq!(output.into_text().unwrap(), r#"{"success":true}"#);
    let output =
        call(&router, "put_object", json!({"bucket": "b", "key": "k", "body": "v"})).await.unwrap();
    assert_eq!(output, ToolOutput::success());
}

#[tokio::test]
async fn copy_object_creates_independent_copy() {
    let router = router();
    call(&router, "create_bucket", json!({"bucket": "src"})).await.unwrap();
    call(&router, "create_bucket", json!({"bucket": "dst"})).await.unwrap();
    call(&router, "put_object", json!({"bucket": "src", "key": "a.txt", "body": "one"}))
        .await
        .unwrap();
    call(
        &router,
        "copy_object",
        json!({
            "sourceBucket": "src",
            "sourceKey": "a.txt",
            "destinationBucket": "dst",
            "destinationKey": "b.txt"
        }),
    )
    .await
    .unwrap();
    call(&router, "delete_object", json!({"bucket": "src", "key": "a.txt"})).await.unwrap();
    let copy = call(&router, "get_object", json!({"bucket": "dst", "key": "b.txt"})).await.unwrap();
    assert_eq!(copy, ToolOutput::Text("one".to_string()));
}

#[tokio::test]
async fn fetch_headers_reports_content_length_and_type() {
    let router = router();
    call(&router, "create_bucket", json!({"bucket": "b"})).await.unwrap();
    call(&router, "put_object", json!({"bucket": "b", "key": "a.json", "body": "{}"}))
        .await
        .unwrap();
    let ToolOutput::Json(headers) =
        call(&router, "fetch_headers", json!({"bucket": "b", "key": "a.json"})).await.unwrap()
    else {
        panic!("expected json headers");
    };
    assert_eq!(headers["contentLength"], 2);
    assert_eq!(headers["contentType"], "application/json");
}

#[tokio::test]
async fn fetch_headers_missing_object_is_not_found() {
    let router = router();
    call(&router, "create_bucket", json!({"bucket": "b"})).await.unwrap();
    let err =
        call(&router, "fetch_headers", json!({"bucket": "b", "key": "x"})).await.unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
}

#[tokio::test]
async fn delete_non_empty_bucket_surfaces_backend_error() {
    let router = router();
    call(&router, "create_bucket", json!({"bucket": "b"})).await.unwrap();
    call(&router, "put_object", json!({"bucket": "b", "key": "k", "body": "v"})).await.unwrap();
    let err = call(&router, "delete_bucket", json!({"bucket": "b"})).await.unwrap_err();
    assert!(matches!(err, ToolError::Storage(StorageError::Backend(_))));
}

#[tokio::test]
async fn bucket_location_and_versions_are_reported() {
    let router = router_with(Arc::new(InMemoryBackend::versioned()), 5_000);
    call(&router, "create_bucket", json!({"bucket": "b"})).await.unwrap();
    let location =
        call(&router, "get_bucket_location", json!({"bucket": "b"})).await.unwrap();
    assert_eq!(location, ToolOutput::Json(json!({"location": "us-east-1"})));
    call(&router, "put_object", json!({"bucket": "b", "key": "k", "body": "1"})).await.unwrap();
    call(&router, "update_object", json!({"bucket": "b", "key": "k", "body": "2"}))
        .await
        .unwrap();
    let ToolOutput::Json(listing) =
        call(&router, "list_object_versions", json!({"bucket": "b"})).await.unwrap()
    else {
        panic!("expected json listing");
    };
    let versions = listing["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["isLatest"], true);
    assert_eq!(versions[1]["isLatest"], false);
    assert!(listing["deleteMarkers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn signed_url_is_wrapped_in_url_field() {
    let router = router();
    let ToolOutput::Json(value) =
        call(&router, "get_signed_url", json!({"bucket": "b", "key": "k", "expiresIn": 10}))
            .await
            .unwrap()
    else {
        panic!("expected json url");
    };
    assert!(value["url"].as_str().unwrap().starts_with("memory://b/k?"));
}

#[tokio::test]
async fn integral_float_lifetime_is_accepted() {
    let router = router();
    let output =
        call(&router, "get_signed_url", json!({"bucket": "b", "key": "k", "expiresIn": 10.0}))
            .await
            .unwrap();
    assert!(matches!(output, ToolOutput::Json(ref value) if value["url"].is_string()));
}

#[test]
fn signed_url_lifetime_decodes_whole_seconds_only() {
    let request: SignedUrlRequest =
        decode(json!({"bucket": "b", "key": "k", "expiresIn": 600.0})).unwrap();
    assert_eq!(request.expires_in, Some(600));
    let request: SignedUrlRequest = decode(json!({"bucket": "b", "key": "k"})).unwrap();
    assert_eq!(request.expires_in, None);
    let err = decode::<SignedUrlRequest>(json!({"bucket": "b", "key": "k", "expiresIn": 1.5}))
        .unwrap_err();
    assert!(err.to_string().contains("whole number of seconds"));
}

#[tokio::test]
async fn slow_backend_call_times_out() {
    let backend = Arc::new(CountingBackend::new(Duration::from_secs(5)));
    let router = router_with(backend, 100);
    let err = call(&router, "list_buckets", json!({})).await.unwrap_err();
    assert!(matches!(err, ToolError::Timeout(100)));
    assert_eq!(err.kind(), "timeout");
}
