// crates/akave-mcp/src/lib.rs
// ============================================================================
// Module: Akave MCP Library
// Description: MCP bridge exposing S3-compatible Akave storage as tools.
// Purpose: Wire storage backends, the tool router, and MCP transports.
// Dependencies: akave-mcp-config, akave-mcp-contract, aws-sdk-s3, axum, tokio
// ============================================================================

//! ## Overview
//! Akave MCP turns JSON-RPC `tools/call` requests into S3 operations against an
//! Akave endpoint. [`StorageGateway`] wraps an [`ObjectBackend`] (the S3 client
//! or the in-memory backend used in tests), [`ToolRouter`] validates and
//! dispatches tool calls, and [`McpServer`] serves the protocol.
//! Invariants:
//! - Tool arguments are schema-checked before any backend call.
//! - Per-call faults become error-flagged results; only startup faults are fatal.
//! - stdout carries protocol frames only; audit output goes to stderr or a file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod backend;
pub mod gateway;
pub mod memory;
pub mod normalize;
pub mod s3;
pub mod server;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use akave_mcp_config as config;
pub use audit::LifecycleAuditEvent;
pub use audit::LifecyclePhase;
pub use audit::McpAuditEvent;
pub use audit::McpAuditSink;
pub use audit::McpFileAuditSink;
pub use audit::McpNoopAuditSink;
pub use audit::McpStderrAuditSink;
pub use backend::ObjectBackend;
pub use backend::ObjectLocation;
pub use backend::StorageError;
pub use gateway::StorageGateway;
pub use memory::InMemoryBackend;
pub use normalize::NormalizationPolicy;
pub use normalize::normalize_content;
pub use s3::S3Backend;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::ShutdownHandle;
pub use telemetry::McpMethod;
pub use telemetry::McpMetricEvent;
pub use telemetry::McpMetrics;
pub use telemetry::McpOutcome;
pub use telemetry::NoopMetrics;
pub use tools::ToolError;
pub use tools::ToolOutput;
pub use tools::ToolRouter;
pub use tools::ToolRouterConfig;

#[cfg(test)]
mod tests;
