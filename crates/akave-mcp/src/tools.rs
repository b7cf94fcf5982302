// crates/akave-mcp/src/tools.rs
// ============================================================================
// Module: MCP Tool Router
// Description: Tool dispatch for the Akave MCP bridge.
// Purpose: Validate tool arguments and route them to the storage gateway.
// Dependencies: akave-mcp-contract, jsonschema, serde, tokio
// ============================================================================

//! ## Overview
//! The tool router owns the immutable tool registry. Each call is checked
//! against the tool's compiled JSON schema before any storage work happens,
//! decoded into a typed request, and dispatched to [`StorageGateway`] under a
//! per-call timeout. Results come back as [`ToolOutput`]; failures as
//! [`ToolError`], which the server converts into protocol responses.
//!
//! ## Invariants
//! - Schema violations never reach the gateway.
//! - A missing object is a [`ToolError::NotFound`], never a backend fault.
//! - Every backend call is bounded by the configured timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use akave_mcp_contract::ToolDefinition;
use akave_mcp_contract::ToolName;
use akave_mcp_contract::tool_definitions;
use jsonschema::Draft;
use jsonschema::Validator;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use serde_json::json;

use crate::backend::StorageError;
use crate::gateway::StorageGateway;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message returned when `get_object` finds nothing.
pub const OBJECT_NOT_FOUND_MESSAGE: &str = "Object not found";

// ============================================================================
// SECTION: Router
// ============================================================================

/// Tool router configuration.
#[derive(Debug, Clone, Copy)]
pub struct ToolRouterConfig {
    /// Per-call timeout in milliseconds.
    pub request_timeout_ms: u64,
}

/// Tool router shared by all transports.
#[derive(Clone)]
pub struct ToolRouter {
    /// Shared router state.
    inner: Arc<RouterInner>,
}

/// Immutable router state.
struct RouterInner {
    /// Storage gateway.
    gateway: StorageGateway,
    /// Tool definitions in canonical order.
    definitions: Vec<ToolDefinition>,
    /// Compiled input validators keyed by tool.
    validators: BTreeMap<ToolName, Validator>,
    /// Per-call timeout in milliseconds.
    request_timeout_ms: u64,
}

impl ToolRouter {
    /// Builds a router, compiling every tool input schema.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Internal`] when a tool schema fails to compile.
    pub fn new(gateway: StorageGateway, config: ToolRouterConfig) -> Result<Self, ToolError> {
        let definitions = tool_definitions();
        let mut validators = BTreeMap::new();
        for definition in &definitions {
            let validator = jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&definition.input_schema)
                .map_err(|err| {
                    ToolError::Internal(format!("invalid schema for {}: {err}", definition.name))
                })?;
            validators.insert(definition.name, validator);
        }
        Ok(Self {
            inner: Arc::new(RouterInner {
                gateway,
                definitions,
                validators,
                request_timeout_ms: config.request_timeout_ms,
            }),
        })
    }

    /// Lists the registered tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.inner.definitions.clone()
    }

    /// Handles a tool call by name with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool is unknown, arguments are invalid,
    /// the object is missing, or storage fails.
    pub async fn handle_tool_call(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let arguments = if arguments.is_null() { Value::Object(Map::new()) } else { arguments };
        self.validate(tool, &arguments)?;
        let limit = Duration::from_millis(self.inner.request_timeout_ms);
        tokio::time::timeout(limit, self.dispatch(tool, arguments))
            .await
            .unwrap_or(Err(ToolError::Timeout(self.inner.request_timeout_ms)))
    }

    /// Checks arguments against the tool's compiled schema.
    fn validate(&self, tool: ToolName, arguments: &Value) -> Result<(), ToolError> {
        let validator = self
            .inner
            .validators
            .get(&tool)
            .ok_or_else(|| ToolError::Internal(format!("missing validator for {tool}")))?;
        let messages: Vec<String> =
            validator.iter_errors(arguments).map(|error| error.to_string()).collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ToolError::InvalidParams(messages.join("; ")))
        }
    }

    /// Routes validated arguments to the gateway.
    async fn dispatch(&self, tool: ToolName, arguments: Value) -> Result<ToolOutput, ToolError> {
        let gateway = &self.inner.gateway;
        match tool {
            ToolName::ListBuckets => {
                decode::<EmptyRequest>(arguments)?;
                ToolOutput::json(&gateway.list_buckets().await?)
            }
            ToolName::ListObjects => {
                let request = decode::<ListRequest>(arguments)?;
                ToolOutput::json(&gateway.list_objects(&request.bucket, request.prefix()).await?)
            }
            ToolName::GetObject => {
                let request = decode::<ObjectRequest>(arguments)?;
                gateway
                    .get_object(&request.bucket, &request.key)
                    .await?
                    .map(ToolOutput::Text)
                    .ok_or_else(|| ToolError::NotFound(OBJECT_NOT_FOUND_MESSAGE.to_string()))
            }
            ToolName::PutObject => {
                let request = decode::<PutRequest>(arguments)?;
                gateway.put_object(&request.bucket, &request.key, &request.body).await?;
                Ok(ToolOutput::success())
            }
            ToolName::UpdateObject => {
                let request = decode::<PutRequest>(arguments)?;
                gateway.update_object(&request.bucket, &request.key, &request.body).await?;
                Ok(ToolOutput::success())
            }
            ToolName::FetchHeaders => {
                let request = decode::<ObjectRequest>(arguments)?;
                ToolOutput::json(&gateway.fetch_headers(&request.bucket, &request.key).await?)
            }
            ToolName::DeleteObject => {
                let request = decode::<ObjectRequest>(arguments)?;
                gateway.delete_object(&request.bucket, &request.key).await?;
                Ok(ToolOutput::success())
            }
            ToolName::CopyObject => {
                let request = decode::<CopyRequest>(arguments)?;
                gateway
                    .copy_object(
                        &request.source_bucket,
                        &request.source_key,
                        &request.destination_bucket,
                        &request.destination_key,
                    )
                    .await?;
                Ok(ToolOutput::success())
            }
            ToolName::CreateBucket => {
                let request = decode::<BucketRequest>(arguments)?;
                gateway.create_bucket(&request.bucket).await?;
                Ok(ToolOutput::success())
            }
            ToolName::DeleteBucket => {
                let request = decode::<BucketRequest>(arguments)?;
                gateway.delete_bucket(&request.bucket).await?;
                Ok(ToolOutput::success())
            }
            ToolName::GetBucketLocation => {
                let request = decode::<BucketRequest>(arguments)?;
                ToolOutput::json(&gateway.get_bucket_location(&request.bucket).await?)
            }
            ToolName::ListObjectVersions => {
                let request = decode::<ListRequest>(arguments)?;
                ToolOutput::json(
                    &gateway.list_object_versions(&request.bucket, request.prefix()).await?,
                )
            }
            ToolName::GetSignedUrl => {
                let request = decode::<SignedUrlRequest>(arguments)?;
                let url = gateway
                    .get_signed_url(&request.bucket, &request.key, request.expires_in)
                    .await?;
                ToolOutput::json(&SignedUrlResponse {
                    url,
                })
            }
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Arguments for tools without parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyRequest {}

/// Arguments addressing a bucket.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BucketRequest {
    /// Bucket name.
    bucket: String,
}

/// Arguments for prefix-filtered listings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListRequest {
    /// Bucket name.
    bucket: String,
    /// Optional key prefix.
    #[serde(default)]
    prefix: Option<String>,
}

impl ListRequest {
    /// Returns the prefix as a borrowed string.
    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

/// Arguments addressing a single object.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectRequest {
    /// Bucket name.
    bucket: String,
    /// Object key.
    key: String,
}

/// Arguments for object writes.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PutRequest {
    /// Bucket name.
    bucket: String,
    /// Object key.
    key: String,
    /// Object content.
    body: String,
}

/// Arguments for `copy_object`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CopyRequest {
    /// Source bucket.
    source_bucket: String,
    /// Source key.
    source_key: String,
    /// Destination bucket.
    destination_bucket: String,
    /// Destination key.
    destination_key: String,
}

/// Arguments for `get_signed_url`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct SignedUrlRequest {
    /// Bucket name.
    bucket: String,
    /// Object key.
    key: String,
    /// Lifetime in seconds.
    #[serde(default, deserialize_with = "whole_seconds")]
    expires_in: Option<u64>,
}

/// Decodes a non-negative whole number of seconds, accepting integral floats
/// such as `10.0` that JSON Schema also treats as integers.
fn whole_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(seconds) = number.as_u64() {
        return Ok(Some(seconds));
    }
    number
        .as_f64()
        .filter(|value| value.fract() == 0.0)
        .and_then(|value| format!("{value}").parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom("expiresIn must be a whole number of seconds"))
}

/// Result payload for `get_signed_url`.
#[derive(Debug, Serialize)]
struct SignedUrlResponse {
    /// Presigned URL.
    url: String,
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Tool result before envelope shaping.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Structured result, rendered as JSON text.
    Json(Value),
    /// Raw text result (normalized object content).
    Text(String),
}

impl ToolOutput {
    /// Serializes a result value.
    fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        serde_json::to_value(value).map(Self::Json).map_err(|_| ToolError::Serialization)
    }

    /// Returns the `{"success": true}` acknowledgement.
    #[must_use]
    pub fn success() -> Self {
        Self::Json(json!({ "success": true }))
    }

    /// Renders the output as the text carried in a content block.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Serialization`] when JSON rendering fails.
    pub fn into_text(self) -> Result<String, ToolError> {
        match self {
            Self::Json(value) => {
                serde_json::to_string(&value).map_err(|_| ToolError::Serialization)
            }
            Self::Text(text) => Ok(text),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Arguments failed schema validation or decoding.
    #[error("schema violation: {0}")]
    InvalidParams(String),
    /// Requested object or bucket does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(StorageError),
    /// Backend call exceeded the per-call timeout.
    #[error("tool call timed out after {0} ms")]
    Timeout(u64),
    /// Result serialization failed.
    #[error("serialization failure")]
    Serialization,
    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidParams(_) => "invalid_params",
            Self::NotFound(_) => "not_found",
            Self::Storage(err) => err.kind(),
            Self::Timeout(_) => "timeout",
            Self::Serialization => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<StorageError> for ToolError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidInput(message) => Self::InvalidParams(message),
            StorageError::NotFound(path) => Self::NotFound(format!("Object not found: {path}")),
            StorageError::NoSuchBucket(bucket) => {
                Self::NotFound(format!("Bucket not found: {bucket}"))
            }
            other => Self::Storage(other),
        }
    }
}

/// Decodes a JSON value into a typed request payload.
fn decode<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, ToolError> {
    serde_json::from_value(payload).map_err(|err| ToolError::InvalidParams(err.to_string()))
}
