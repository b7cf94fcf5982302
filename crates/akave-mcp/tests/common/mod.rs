// crates/akave-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fixtures for Akave MCP integration tests.
// Purpose: Run servers over in-memory backends and in-process pipes.
// Dependencies: akave-mcp, tokio
// ============================================================================

//! ## Overview
//! Builds servers over [`InMemoryBackend`] and drives the stdio transport
//! through a `tokio::io::duplex` pipe so tests never touch the network or the
//! process stdio handles.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use akave_mcp::InMemoryBackend;
use akave_mcp::McpServer;
use akave_mcp::McpServerError;
use akave_mcp::StorageGateway;
use akave_mcp::config::ServerConfig;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::DuplexStream;
use tokio::io::ReadHalf;
use tokio::io::WriteHalf;
use tokio::task::JoinHandle;

// ============================================================================
// SECTION: Servers
// ============================================================================

/// Builds a server over a fresh in-memory backend.
pub fn memory_server(config: ServerConfig) -> McpServer {
    let gateway = StorageGateway::new(Arc::new(InMemoryBackend::new()), 1024 * 1024);
    McpServer::new(config, gateway).expect("server")
}

/// Client end of a stdio session running in a background task.
pub struct StdioSession {
    /// Server, kept for stop signalling.
    pub server: Arc<McpServer>,
    /// Response reader.
    reader: BufReader<ReadHalf<DuplexStream>>,
    /// Request writer; `None` once closed.
    writer: Option<WriteHalf<DuplexStream>>,
    /// Server task.
    task: JoinHandle<Result<(), McpServerError>>,
    /// Next request id.
    next_id: u64,
}

impl StdioSession {
    /// Starts `server` on an in-process pipe.
    pub fn start(server: McpServer) -> Self {
        let server = Arc::new(server);
        let (client, server_side) = tokio::io::duplex(256 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);
        let (client_read, client_write) = tokio::io::split(client);
        let runner = Arc::clone(&server);
        let task = tokio::spawn(async move { runner.serve_io(server_read, server_write).await });
        Self {
            server,
            reader: BufReader::new(client_read),
            writer: Some(client_write),
            task,
            next_id: 1,
        }
    }

    /// Starts a default stdio server over a fresh in-memory backend.
    pub fn start_default() -> Self {
        Self::start(memory_server(ServerConfig::default()))
    }

    /// Writes raw bytes to the server.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let writer = self.writer.as_mut().expect("writer open");
        writer.write_all(bytes).await.unwrap();
        writer.flush().await.unwrap();
    }

    /// Writes one newline-delimited JSON message.
    pub async fn send_line(&mut self, message: &Value) {
        let mut bytes = serde_json::to_vec(message).unwrap();
        bytes.push(b'\n');
        self.send_raw(&bytes).await;
    }

    /// Reads one newline-delimited response.
    pub async fn read_line(&mut self) -> Value {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await.unwrap();
        assert!(read > 0, "server closed output");
        serde_json::from_str(line.trim_end()).unwrap()
    }

    /// Reads one `Content-Length` framed response.
    pub async fn read_framed(&mut self) -> Value {
        let mut length = None;
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).await.unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.strip_prefix("Content-Length:") {
                length = Some(value.trim().parse::<usize>().unwrap());
            }
        }
        let mut body = vec![0_u8; length.expect("content-length header")];
        self.reader.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Sends a request and returns its response.
    pub async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send_line(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        let response = self.read_line().await;
        assert_eq!(response["id"], id);
        response
    }

    /// Calls a tool and returns the `result` envelope.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Value {
        let response =
            self.request("tools/call", json!({"name": name, "arguments": arguments})).await;
        response.get("result").cloned().expect("tool result envelope")
    }

    /// Closes the input stream.
    pub async fn close_input(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.unwrap();
        }
    }

    /// Waits for the server task to finish.
    pub async fn join(self) -> Result<(), McpServerError> {
        self.task.await.expect("server task")
    }
}

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// Returns the text of the single content block.
pub fn envelope_text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().expect("text content block")
}

/// Returns true when the envelope carries `isError: true`.
pub fn envelope_is_error(result: &Value) -> bool {
    result.get("isError").and_then(Value::as_bool).unwrap_or(false)
}
