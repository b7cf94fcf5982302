// crates/akave-mcp-config/src/lib.rs
// ============================================================================
// Module: Akave MCP Config Library
// Description: Canonical config model, environment overlay, and validation.
// Purpose: Single source of truth for bridge startup configuration.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `akave-mcp-config` defines the configuration model for the Akave MCP
//! bridge. Values come from an optional `akave-mcp.toml` file followed by an
//! environment overlay for the storage endpoint and static credentials.
//! Validation is strict and fail-closed; the process refuses to serve until
//! every required credential is present.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
