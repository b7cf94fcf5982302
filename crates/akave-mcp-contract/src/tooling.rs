// crates/akave-mcp-contract/src/tooling.rs
// ============================================================================
// Module: MCP Tool Contracts
// Description: Canonical MCP tool definitions and input schemas.
// Purpose: Provide tool contracts for MCP listing and argument validation.
// Dependencies: serde_json, akave-mcp-contract::types
// ============================================================================

//! ## Overview
//! This module defines the canonical MCP tool surface. Every tool carries a
//! closed-world object schema: unknown properties are rejected, bucket and key
//! identifiers must be non-empty, and signed URL expiry is bounded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::types::ToolDefinition;
use crate::types::ToolName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Signed URL lifetime applied when `expiresIn` is omitted.
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 3600;
/// Smallest accepted signed URL lifetime.
pub const MIN_SIGNED_URL_EXPIRY_SECS: u64 = 1;
/// Largest accepted signed URL lifetime (seven days, the SigV4 ceiling).
pub const MAX_SIGNED_URL_EXPIRY_SECS: u64 = 604_800;

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Returns the canonical MCP tool definitions.
///
/// The order matches [`ToolName::all`] and is preserved in `tools/list`.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::all().iter().map(|name| tool_definition(*name)).collect()
}

/// Returns the definition for a single tool.
#[must_use]
pub fn tool_definition(name: ToolName) -> ToolDefinition {
    let (description, input_schema) = match name {
        ToolName::ListBuckets => {
            ("List all buckets in Akave storage", tool_input_schema(&json!({}), &[]))
        }
        ToolName::ListObjects => ("List objects in a bucket", bucket_prefix_schema()),
        ToolName::GetObject => ("Get object content from a bucket", bucket_key_schema()),
        ToolName::PutObject => ("Put object into a bucket", object_body_schema()),
        ToolName::UpdateObject => {
            ("Update an existing object, overwriting its content", object_body_schema())
        }
        ToolName::FetchHeaders => {
            ("Fetch object headers and metadata without the body", bucket_key_schema())
        }
        ToolName::DeleteObject => ("Delete an object from a bucket", bucket_key_schema()),
        ToolName::CopyObject => ("Copy an object to another bucket or key", copy_schema()),
        ToolName::CreateBucket => ("Create a new bucket", bucket_schema()),
        ToolName::DeleteBucket => ("Delete an empty bucket", bucket_schema()),
        ToolName::GetBucketLocation => ("Get the location of a bucket", bucket_schema()),
        ToolName::ListObjectVersions => {
            ("List object versions and delete markers in a bucket", bucket_prefix_schema())
        }
        ToolName::GetSignedUrl => ("Get a signed URL for an object", signed_url_schema()),
    };
    ToolDefinition {
        name,
        description: description.to_string(),
        input_schema,
    }
}

// ============================================================================
// SECTION: Input Schemas
// ============================================================================

/// Schema for tools addressing a bucket.
fn bucket_schema() -> Value {
    tool_input_schema(
        &json!({
            "bucket": schema_identifier("Bucket name")
        }),
        &["bucket"],
    )
}

/// Schema for tools addressing a bucket with an optional key prefix.
fn bucket_prefix_schema() -> Value {
    tool_input_schema(
        &json!({
            "bucket": schema_identifier("Bucket name"),
            "prefix": {
                "type": "string",
                "description": "Optional prefix to filter objects"
            }
        }),
        &["bucket"],
    )
}

/// Schema for tools addressing a single object.
fn bucket_key_schema() -> Value {
    tool_input_schema(
        &json!({
            "bucket": schema_identifier("Bucket name"),
            "key": schema_identifier("Object key")
        }),
        &["bucket", "key"],
    )
}

/// Schema for tools writing object content.
fn object_body_schema() -> Value {
    tool_input_schema(
        &json!({
            "bucket": schema_identifier("Bucket name"),
            "key": schema_identifier("Object key"),
            "body": {
                "type": "string",
                "description": "Object content"
            }
        }),
        &["bucket", "key", "body"],
    )
}

/// Schema for `copy_object`.
fn copy_schema() -> Value {
    tool_input_schema(
        &json!({
            "sourceBucket": schema_identifier("Source bucket name"),
            "sourceKey": schema_identifier("Source object key"),
            "destinationBucket": schema_identifier("Destination bucket name"),
            "destinationKey": schema_identifier("Destination object key")
        }),
        &["sourceBucket", "sourceKey", "destinationBucket", "destinationKey"],
    )
}

/// Schema for `get_signed_url`.
fn signed_url_schema() -> Value {
    tool_input_schema(
        &json!({
            "bucket": schema_identifier("Bucket name"),
            "key": schema_identifier("Object key"),
            "expiresIn": {
                "type": "integer",
                "minimum": MIN_SIGNED_URL_EXPIRY_SECS,
                "maximum": MAX_SIGNED_URL_EXPIRY_SECS,
                "default": DEFAULT_SIGNED_URL_EXPIRY_SECS,
                "description": "URL expiration time in seconds"
            }
        }),
        &["bucket", "key"],
    )
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

/// Builds a standard tool input schema wrapper.
#[must_use]
fn tool_input_schema(properties: &Value, required: &[&str]) -> Value {
    with_schema(object_schema(properties, required))
}

/// Builds a closed object schema.
#[must_use]
fn object_schema(properties: &Value, required: &[&str]) -> Value {
    let required_values: Vec<Value> =
        required.iter().map(|value| Value::String((*value).to_string())).collect();
    json!({
        "type": "object",
        "required": required_values,
        "properties": properties,
        "additionalProperties": false
    })
}

/// Adds a `$schema` header to a top-level JSON schema.
#[must_use]
fn with_schema(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return schema;
    };
    map.insert(
        String::from("$schema"),
        Value::String(String::from("https://json-schema.org/draft/2020-12/schema")),
    );
    Value::Object(map)
}

/// Returns a schema describing non-empty identifiers.
#[must_use]
fn schema_identifier(description: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": description
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
