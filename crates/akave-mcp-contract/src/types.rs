// crates/akave-mcp-contract/src/types.rs
// ============================================================================
// Module: Contract Types
// Description: Tool identifiers and tool definition shapes.
// Purpose: Shared tool naming across contracts, runtime, and CLI.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Canonical tool identifiers and the definition shape returned by
//! `tools/list`. Tool names are part of the external contract surface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Canonical tool names for the Akave MCP bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// List all buckets visible to the credentials.
    ListBuckets,
    /// List objects in a bucket (first page only).
    ListObjects,
    /// Fetch normalized object content.
    GetObject,
    /// Create or overwrite an object.
    PutObject,
    /// Overwrite an object (alias of put).
    UpdateObject,
    /// Fetch object headers without the body.
    FetchHeaders,
    /// Delete an object.
    DeleteObject,
    /// Copy an object between locations.
    CopyObject,
    /// Create a bucket.
    CreateBucket,
    /// Delete an empty bucket.
    DeleteBucket,
    /// Fetch a bucket's location.
    GetBucketLocation,
    /// List object versions and delete markers.
    ListObjectVersions,
    /// Issue a time-bounded read URL.
    GetSignedUrl,
}

impl ToolName {
    /// Returns the canonical string name for the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListBuckets => "list_buckets",
            Self::ListObjects => "list_objects",
            Self::GetObject => "get_object",
            Self::PutObject => "put_object",
            Self::UpdateObject => "update_object",
            Self::FetchHeaders => "fetch_headers",
            Self::DeleteObject => "delete_object",
            Self::CopyObject => "copy_object",
            Self::CreateBucket => "create_bucket",
            Self::DeleteBucket => "delete_bucket",
            Self::GetBucketLocation => "get_bucket_location",
            Self::ListObjectVersions => "list_object_versions",
            Self::GetSignedUrl => "get_signed_url",
        }
    }

    /// Returns all tool names in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ListBuckets,
            Self::ListObjects,
            Self::GetObject,
            Self::PutObject,
            Self::UpdateObject,
            Self::FetchHeaders,
            Self::DeleteObject,
            Self::CopyObject,
            Self::CreateBucket,
            Self::DeleteBucket,
            Self::GetBucketLocation,
            Self::ListObjectVersions,
            Self::GetSignedUrl,
        ]
    }

    /// Parses a tool name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "list_buckets" => Some(Self::ListBuckets),
            "list_objects" => Some(Self::ListObjects),
            "get_object" => Some(Self::GetObject),
            "put_object" => Some(Self::PutObject),
            "update_object" => Some(Self::UpdateObject),
            "fetch_headers" => Some(Self::FetchHeaders),
            "delete_object" => Some(Self::DeleteObject),
            "copy_object" => Some(Self::CopyObject),
            "create_bucket" => Some(Self::CreateBucket),
            "delete_bucket" => Some(Self::DeleteBucket),
            "get_bucket_location" => Some(Self::GetBucketLocation),
            "list_object_versions" => Some(Self::ListObjectVersions),
            "get_signed_url" => Some(Self::GetSignedUrl),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Tool definition shape used by MCP tool listings.
///
/// # Invariants
/// - `name` is a stable MCP tool identifier.
/// - `input_schema` is a JSON Schema payload for the tool input shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: ToolName,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}
