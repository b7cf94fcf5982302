// crates/akave-mcp-contract/src/lib.rs
// ============================================================================
// Module: Akave MCP Contract Library
// Description: Canonical MCP tool surface for the Akave storage bridge.
// Purpose: Single source of truth for tool names and input schemas.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! `akave-mcp-contract` defines the fixed tool surface exposed by the bridge:
//! the [`ToolName`] identifiers and one [`ToolDefinition`] per tool carrying a
//! strict JSON Schema (draft 2020-12) for its arguments. The runtime compiles
//! these schemas into validators at startup, so argument checking is data
//! driven rather than hand-written per tool.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod tooling;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use tooling::DEFAULT_SIGNED_URL_EXPIRY_SECS;
pub use tooling::MAX_SIGNED_URL_EXPIRY_SECS;
pub use tooling::MIN_SIGNED_URL_EXPIRY_SECS;
pub use tooling::tool_definition;
pub use tooling::tool_definitions;
pub use types::ToolDefinition;
pub use types::ToolName;
