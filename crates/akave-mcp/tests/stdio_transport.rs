// crates/akave-mcp/tests/stdio_transport.rs
// ============================================================================
// Module: Stdio Transport Tests
// Description: End-to-end tests for the stdio JSON-RPC transport.
// Purpose: Validate handshake, framing, lifecycle, and tool envelopes.
// Dependencies: akave-mcp, tokio
// ============================================================================

//! ## Overview
//! Drives a full server over an in-process pipe:
//! - newline-delimited and `Content-Length` framing
//! - notifications, protocol errors, and tool error envelopes
//! - shutdown by input close and by stop signal

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions are permitted."
)]

mod common;

use std::time::Duration;

use serde_json::json;

use crate::common::StdioSession;
use crate::common::envelope_is_error;
use crate::common::envelope_text;

// ============================================================================
// SECTION: Protocol
// ============================================================================

#[tokio::test]
async fn handshake_then_tools_list() {
    let mut session = StdioSession::start_default();
    let init = session.request("initialize", json!({"protocolVersion": "2024-11-05"})).await;
    assert!(init["result"]["capabilities"]["tools"].is_object());
    session.send_line(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).await;
    let pong = session.request("ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));
    let list = session.request("tools/list", json!({})).await;
    let tools = list["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 13);
    assert!(tools.iter().all(|tool| tool["inputSchema"]["type"] == "object"));
    session.close_input().await;
    session.join().await.unwrap();
}

#[tokio::test]
async fn protocol_errors_map_to_json_rpc_codes() {
    let mut session = StdioSession::start_default();
    session.send_raw(b"{broken\n").await;
    let parse = session.read_line().await;
    assert_eq!(parse["error"]["code"], -32700);
    let unknown = session.request("resources/list", json!({})).await;
    assert_eq!(unknown["error"]["code"], -32601);
    let tool = session.request("tools/call", json!({"name": "nope", "arguments": {}})).await;
    assert_eq!(tool["error"]["code"], -32601);
    let params = session.request("tools/call", json!({"arguments": {}})).await;
    assert_eq!(params["error"]["code"], -32602);
    session.close_input().await;
    session.join().await.unwrap();
}

#[tokio::test]
async fn content_length_requests_are_answered_in_kind() {
    let mut session = StdioSession::start_default();
    let body = br#"{"jsonrpc":"2.0","id":41,"method":"ping"}"#;
    let framed = format!("Content-Length: {}\r\n\r\n", body.len());
    session.send_raw(framed.as_bytes()).await;
    session.send_raw(body).await;
    let response = session.read_framed().await;
    assert_eq!(response["id"], 41);
    assert_eq!(response["result"], json!({}));
    let line = session.request("ping", json!({})).await;
    assert_eq!(line["result"], json!({}));
    session.close_input().await;
    session.join().await.unwrap();
}

// ============================================================================
// SECTION: Tool Flows
// ============================================================================

#[tokio::test]
async fn json_object_lifecycle_end_to_end() {
    let mut session = StdioSession::start_default();
    let created = session.call_tool("create_bucket", json!({"bucket": "t1"})).await;
    assert_eq!(envelope_text(&created), r#"{"success":true}"#);
    let put = session
        .call_tool("put_object", json!({"bucket": "t1", "key": "a.json", "body": "{\"x\":1}"}))
        .await;
    assert!(!envelope_is_error(&put));
    let fetched = session.call_tool("get_object", json!({"bucket": "t1", "key": "a.json"})).await;
    assert_eq!(envelope_text(&fetched), "{\n  \"x\": 1\n}");
    let deleted =
        session.call_tool("delete_object", json!({"bucket": "t1", "key": "a.json"})).await;
    assert!(!envelope_is_error(&deleted));
    let missing = session.call_tool("get_object", json!({"bucket": "t1", "key": "a.json"})).await;
    assert!(envelope_is_error(&missing));
    assert_eq!(envelope_text(&missing), "Object not found");
    let dropped = session.call_tool("delete_bucket", json!({"bucket": "t1"})).await;
    assert_eq!(envelope_text(&dropped), r#"{"success":true}"#);
    session.close_input().await;
    session.join().await.unwrap();
}

#[tokio::test]
async fn empty_bucket_lists_no_objects() {
    let mut session = StdioSession::start_default();
    session.call_tool("create_bucket", json!({"bucket": "empty"})).await;
    let listing = session.call_tool("list_objects", json!({"bucket": "empty"})).await;
    assert_eq!(envelope_text(&listing), "[]");
    session.close_input().await;
    session.join().await.unwrap();
}

#[tokio::test]
async fn update_then_get_returns_new_text() {
    let mut session = StdioSession::start_default();
    session.call_tool("create_bucket", json!({"bucket": "docs"})).await;
    session
        .call_tool("put_object", json!({"bucket": "docs", "key": "n.md", "body": "\u{feff} one \n"}))
        .await;
    session
        .call_tool("update_object", json!({"bucket": "docs", "key": "n.md", "body": "  two\n"}))
        .await;
    let fetched = session.call_tool("get_object", json!({"bucket": "docs", "key": "n.md"})).await;
    assert_eq!(envelope_text(&fetched), "two");
    session.close_input().await;
    session.join().await.unwrap();
}

#[tokio::test]
async fn deleting_missing_object_succeeds() {
    let mut session = StdioSession::start_default();
    session.call_tool("create_bucket", json!({"bucket": "b"})).await;
    let deleted = session.call_tool("delete_object", json!({"bucket": "b", "key": "ghost"})).await;
    assert!(!envelope_is_error(&deleted));
    session.close_input().await;
    session.join().await.unwrap();
}

#[tokio::test]
async fn signed_urls_are_issued_per_request() {
    // Covers the uncached request path only. The in-memory backend numbers each
    // grant; SigV4 grants differ only once `X-Amz-Date` moves to the next second.
    let mut session = StdioSession::start_default();
    let args = json!({"bucket": "b", "key": "k", "expiresIn": 10});
    let first = session.call_tool("get_signed_url", args.clone()).await;
    let second = session.call_tool("get_signed_url", args).await;
    let first: serde_json::Value = serde_json::from_str(envelope_text(&first)).unwrap();
    let second: serde_json::Value = serde_json::from_str(envelope_text(&second)).unwrap();
    assert!(first["url"].is_string());
    assert_ne!(first["url"], second["url"]);
    session.close_input().await;
    session.join().await.unwrap();
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[tokio::test]
async fn stop_ends_session_with_input_open() {
    let mut session = StdioSession::start_default();
    let pong = session.request("ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));
    session.server.stop();
    tokio::time::timeout(Duration::from_secs(5), session.join())
        .await
        .expect("server stops")
        .unwrap();
}
