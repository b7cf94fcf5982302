// crates/akave-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: JSON-RPC 2.0 server for the Akave MCP bridge.
// Purpose: Serve the tool surface over stdio, HTTP, or SSE transports.
// Dependencies: akave-mcp-config, akave-mcp-contract, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server accepts JSON-RPC 2.0 requests and forwards `tools/call`
//! invocations to [`ToolRouter`]. The stdio transport accepts newline-delimited
//! messages and `Content-Length` framed messages, answering each in the framing
//! it arrived in. HTTP and SSE transports accept `POST /rpc`.
//!
//! ## Invariants
//! - Notifications (requests without an `id`) never receive a response.
//! - Bodies larger than `server.max_body_bytes` are rejected before parsing
//!   with the `-32070` error on every transport.
//! - Every request produces exactly one audit event and one metric event.
//! - Nothing but protocol frames is written to the stdio output stream.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use akave_mcp_config::AkaveConfig;
use akave_mcp_config::ServerAuditConfig;
use akave_mcp_config::ServerConfig;
use akave_mcp_config::ServerTransport;
use akave_mcp_contract::ToolName;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::sse::Event;
use axum::response::sse::Sse;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::audit::LifecycleAuditEvent;
use crate::audit::LifecyclePhase;
use crate::audit::McpAuditEvent;
use crate::audit::McpAuditEventParams;
use crate::audit::McpAuditSink;
use crate::audit::McpFileAuditSink;
use crate::audit::McpNoopAuditSink;
use crate::audit::McpStderrAuditSink;
use crate::gateway::StorageGateway;
use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpMetrics;
use crate::telemetry::McpOutcome;
use crate::telemetry::NoopMetrics;
use crate::tools::ToolError;
use crate::tools::ToolRouter;
use crate::tools::ToolRouterConfig;


// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol revision advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name advertised by `initialize`.
pub const SERVER_NAME: &str = "akave-mcp";
/// HTTP route accepting JSON-RPC requests.
pub const RPC_PATH: &str = "/rpc";

/// JSON-RPC parse error.
const PARSE_ERROR: i64 = -32700;
/// JSON-RPC invalid request.
const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC method (or tool) not found.
const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC invalid params.
const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC internal error.
const INTERNAL_ERROR: i64 = -32603;
/// Request body exceeded `server.max_body_bytes`.
const BODY_TOO_LARGE: i64 = -32070;

/// Maximum size of a single `Content-Length` header line.
const MAX_HEADER_LINE_BYTES: u64 = 1024;
/// Maximum number of header lines in one framed message.
const MAX_HEADER_LINES: usize = 16;
/// Chunk size used when discarding an oversized line.
const DRAIN_CHUNK_BYTES: u64 = 64 * 1024;
/// Pending responses buffered for the stdio writer.
const OUTBOUND_QUEUE: usize = 64;

/// Response written when a response itself cannot be serialized.
const FALLBACK_RESPONSE: &[u8] =
    br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"internal error"}}"#;

// ============================================================================
// SECTION: Server
// ============================================================================

/// MCP server bound to one transport.
pub struct McpServer {
    /// Server configuration.
    config: ServerConfig,
    /// Tool router shared by all requests.
    router: ToolRouter,
    /// Audit sink for request and lifecycle events.
    audit: Arc<dyn McpAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn McpMetrics>,
    /// Stop signal.
    shutdown: ShutdownHandle,
}

impl McpServer {
    /// Builds a server from a loaded configuration, connecting the S3 backend.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Config`] when validation fails and
    /// [`McpServerError::Init`] when the backend or audit sink cannot be built.
    pub async fn from_config(config: AkaveConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let gateway = StorageGateway::connect(&config.storage)
            .await
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let audit = build_audit_sink(&config.server.audit)?;
        Ok(Self::new(config.server, gateway)?.with_audit(audit))
    }

    /// Builds a server over an existing gateway with no-op audit and metrics.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Init`] when the tool registry fails to build.
    pub fn new(config: ServerConfig, gateway: StorageGateway) -> Result<Self, McpServerError> {
        let router = ToolRouter::new(
            gateway,
            ToolRouterConfig {
                request_timeout_ms: config.request_timeout_ms,
            },
        )
        .map_err(|err| McpServerError::Init(err.to_string()))?;
        Ok(Self {
            config,
            router,
            audit: Arc::new(McpNoopAuditSink),
            metrics: Arc::new(NoopMetrics),
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn McpAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns a handle that stops this server.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signals the server to stop.
    pub fn stop(&self) {
        self.shutdown.stop();
    }

    /// Serves requests on the configured transport until input closes or
    /// [`McpServer::stop`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(&self) -> Result<(), McpServerError> {
        match self.config.transport {
            ServerTransport::Stdio => self.serve_io(tokio::io::stdin(), tokio::io::stdout()).await,
            ServerTransport::Http | ServerTransport::Sse => {
                let addr = self
                    .config
                    .bind_addr()
                    .map_err(|err| McpServerError::Config(err.to_string()))?;
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|err| McpServerError::Transport(format!("bind {addr}: {err}")))?;
                self.serve_listener(listener).await
            }
        }
    }

    /// Serves stdio-style framed messages over an arbitrary reader and writer.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] on I/O or framing failures.
    pub async fn serve_io<R, W>(&self, reader: R, writer: W) -> Result<(), McpServerError>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let state = self.state(ServerTransport::Stdio);
        state.audit.record_lifecycle(&LifecycleAuditEvent::new(
            ServerTransport::Stdio,
            LifecyclePhase::Started,
            None,
        ));

        let (tx, rx) = mpsc::channel::<(Framing, Vec<u8>)>(OUTBOUND_QUEUE);
        let writer_task = tokio::spawn(write_loop(writer, rx));
        let mut reader = BufReader::new(reader);
        let mut tasks = JoinSet::new();
        let mut shutdown = self.shutdown.subscribe();

        let (outcome, reason) = loop {
            let inbound = tokio::select! {
                biased;
                () = wait_for_stop(&mut shutdown) => break (Ok(()), "stopped"),
                inbound = read_message(&mut reader, state.max_body_bytes) => inbound,
            };
            match inbound {
                Ok(Inbound::Eof) => break (Ok(()), "input closed"),
                Ok(Inbound::Oversized {
                    framing,
                    size,
                }) => {
                    let bytes = state.reject_oversized(size);
                    if tx.send((framing, bytes)).await.is_err() {
                        break (Ok(()), "output closed");
                    }
                }
                Ok(Inbound::Message {
                    framing,
                    payload,
                }) => {
                    let state = Arc::clone(&state);
                    let tx = tx.clone();
                    tasks.spawn(async move {
                        if let Some((_, bytes)) = handle_payload(&state, &payload).await {
                            let _ = tx.send((framing, bytes)).await;
                        }
                    });
                }
                Err(err) => break (Err(err), "transport error"),
            }
            while tasks.try_join_next().is_some() {}
        };

        while tasks.join_next().await.is_some() {}
        drop(tx);
        let written = match writer_task.await {
            Ok(result) => result.map_err(|err| McpServerError::Transport(err.to_string())),
            Err(err) => Err(McpServerError::Transport(err.to_string())),
        };
        state.audit.record_lifecycle(&LifecycleAuditEvent::new(
            ServerTransport::Stdio,
            LifecyclePhase::Stopped,
            Some(reason.to_string()),
        ));
        outcome.and(written)
    }

    /// Serves HTTP or SSE requests on an already-bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] when the listener fails.
    pub async fn serve_listener(&self, listener: TcpListener) -> Result<(), McpServerError> {
        let transport = match self.config.transport {
            ServerTransport::Sse => ServerTransport::Sse,
            ServerTransport::Http | ServerTransport::Stdio => ServerTransport::Http,
        };
        let state = self.state(transport);
        let app = build_router(transport, Arc::clone(&state));
        let local = listener.local_addr().map(|addr| addr.to_string()).ok();
        state.audit.record_lifecycle(&LifecycleAuditEvent::new(
            transport,
            LifecyclePhase::Started,
            local,
        ));
        let mut shutdown = self.shutdown.subscribe();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                wait_for_stop(&mut shutdown).await;
            })
            .await
            .map_err(|err| McpServerError::Transport(err.to_string()));
        state.audit.record_lifecycle(&LifecycleAuditEvent::new(
            transport,
            LifecyclePhase::Stopped,
            None,
        ));
        served
    }

    /// Builds shared per-transport request state.
    fn state(&self, transport: ServerTransport) -> Arc<ServerState> {
        Arc::new(ServerState {
            router: self.router.clone(),
            transport,
            max_body_bytes: self.config.max_body_bytes,
            audit: Arc::clone(&self.audit),
            metrics: Arc::clone(&self.metrics),
        })
    }
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn McpAuditSink>, McpServerError> {
    if !config.enabled {
        return Ok(Arc::new(McpNoopAuditSink));
    }
    match &config.path {
        Some(path) => McpFileAuditSink::new(path)
            .map(|sink| Arc::new(sink) as Arc<dyn McpAuditSink>)
            .map_err(|err| McpServerError::Init(format!("audit log {}: {err}", path.display()))),
        None => Ok(Arc::new(McpStderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Shutdown
// ============================================================================

/// Cloneable stop signal for a running server.
#[derive(Clone)]
pub struct ShutdownHandle {
    /// Watch channel carrying the stopped flag.
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Creates a handle in the running state.
    fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Requests a stop. Idempotent.
    pub fn stop(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }

    /// Subscribes to the stop signal.
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Resolves once the stop flag is set.
async fn wait_for_stop(receiver: &mut watch::Receiver<bool>) {
    let _ = receiver.wait_for(|stopped| *stopped).await;
}

// ============================================================================
// SECTION: Request State
// ============================================================================

/// Request handling state shared by a transport.
struct ServerState {
    /// Tool router.
    router: ToolRouter,
    /// Transport label for audit and metrics.
    transport: ServerTransport,
    /// Maximum request body size.
    max_body_bytes: usize,
    /// Audit sink.
    audit: Arc<dyn McpAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn McpMetrics>,
}

impl ServerState {
    /// Records and serializes the response for a body that was never read.
    fn reject_oversized(&self, size: usize) -> Vec<u8> {
        let started = Instant::now();
        let response = JsonRpcResponse::error(Value::Null, BODY_TOO_LARGE, "request body too large");
        let trace = RequestTrace::new(McpMethod::Invalid);
        let bytes = encode_response(&response);
        self.observe(&trace, &response, size, bytes.len(), started);
        bytes
    }

    /// Emits the audit and metric events for one request.
    fn observe(
        &self,
        trace: &RequestTrace,
        response: &JsonRpcResponse,
        request_bytes: usize,
        response_bytes: usize,
        started: Instant,
    ) {
        let error_code = response.error.as_ref().map(|error| error.code);
        let outcome = if error_code.is_some() || trace.tool_failed {
            McpOutcome::Error
        } else {
            McpOutcome::Ok
        };
        let error_kind = trace.error_kind.or_else(|| error_code.map(jsonrpc_error_kind));
        let latency = started.elapsed();
        let event = McpMetricEvent {
            transport: self.transport,
            method: trace.method,
            tool: trace.tool,
            outcome,
            error_code,
            error_kind,
            request_bytes,
            response_bytes,
        };
        self.metrics.record_request(event.clone());
        self.metrics.record_latency(event, latency);
        self.audit.record(&McpAuditEvent::new(McpAuditEventParams {
            request_id: response_id_label(&response.id),
            transport: self.transport,
            method: trace.method,
            tool: trace.tool,
            outcome,
            error_code,
            error_kind,
            error_message: trace
                .error_message
                .clone()
                .or_else(|| response.error.as_ref().map(|error| error.message.clone())),
            request_bytes,
            response_bytes,
            latency_ms: latency.as_millis(),
        }));
    }
}

/// Audit-relevant facts gathered while handling a request.
struct RequestTrace {
    /// Method classification.
    method: McpMethod,
    /// Tool name for `tools/call`.
    tool: Option<ToolName>,
    /// Error kind for a failed tool call.
    error_kind: Option<&'static str>,
    /// Error detail for a failed tool call.
    error_message: Option<String>,
    /// True when the tool result carries `isError`.
    tool_failed: bool,
}

impl RequestTrace {
    /// Creates a trace with no tool and no failure.
    const fn new(method: McpMethod) -> Self {
        Self {
            method,
            tool: None,
            error_kind: None,
            error_message: None,
            tool_failed: false,
        }
    }
}

// ============================================================================
// SECTION: JSON-RPC Types
// ============================================================================

/// Inbound JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// Protocol version; must be `2.0`.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Method parameters.
    #[serde(default)]
    params: Value,
}

/// Outbound JSON-RPC response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// Protocol version.
    jsonrpc: &'static str,
    /// Echoed request identifier.
    id: Value,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    const fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Error message.
    message: String,
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Tool arguments.
    #[serde(default)]
    arguments: Value,
}

/// `tools/call` result envelope.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Content blocks; always a single text block.
    content: Vec<ToolContent>,
    /// Set only when the tool failed.
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    is_error: bool,
}

impl ToolCallResult {
    /// Wraps text in a single content block.
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text",
                text,
            }],
            is_error,
        }
    }
}

/// Text content block.
#[derive(Debug, Serialize)]
struct ToolContent {
    /// Block type; always `text`.
    #[serde(rename = "type")]
    kind: &'static str,
    /// Block text.
    text: String,
}

// ============================================================================
// SECTION: Request Handling
// ============================================================================

/// Handles one raw request body; returns the status and encoded response, or
/// `None` for notifications.
async fn handle_payload(state: &ServerState, bytes: &[u8]) -> Option<(StatusCode, Vec<u8>)> {
    let started = Instant::now();
    let (status, response, trace) = parse_request(state, bytes).await;
    let Some(response) = response else {
        let placeholder = JsonRpcResponse::result(Value::Null, Value::Null);
        state.observe(&trace, &placeholder, bytes.len(), 0, started);
        return None;
    };
    let encoded = encode_response(&response);
    state.observe(&trace, &response, bytes.len(), encoded.len(), started);
    Some((status, encoded))
}

/// Parses and dispatches one request body.
async fn parse_request(
    state: &ServerState,
    bytes: &[u8],
) -> (StatusCode, Option<JsonRpcResponse>, RequestTrace) {
    if bytes.len() > state.max_body_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Some(JsonRpcResponse::error(Value::Null, BODY_TOO_LARGE, "request body too large")),
            RequestTrace::new(McpMethod::Invalid),
        );
    }
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Some(JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {err}"))),
                RequestTrace::new(McpMethod::Invalid),
            );
        }
    };
    let raw_id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Some(JsonRpcResponse::error(
                    raw_id,
                    INVALID_REQUEST,
                    format!("invalid request: {err}"),
                )),
                RequestTrace::new(McpMethod::Invalid),
            );
        }
    };
    if request.jsonrpc != "2.0" {
        return (
            StatusCode::BAD_REQUEST,
            Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "invalid json-rpc version",
            )),
            RequestTrace::new(McpMethod::Invalid),
        );
    }
    let Some(id) = request.id else {
        return (StatusCode::ACCEPTED, None, RequestTrace::new(McpMethod::Notification));
    };
    let method = McpMethod::from_method(&request.method);
    let mut trace = RequestTrace::new(method);
    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::result(id, initialize_result()),
        "ping" => JsonRpcResponse::result(id, json!({})),
        "tools/list" => JsonRpcResponse::result(id, json!({ "tools": state.router.list_tools() })),
        "tools/call" => handle_tool_call(state, id, request.params, &mut trace).await,
        _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "method not found"),
    };
    (StatusCode::OK, Some(response), trace)
}

/// Dispatches `tools/call` and shapes the result envelope.
async fn handle_tool_call(
    state: &ServerState,
    id: Value,
    params: Value,
    trace: &mut RequestTrace,
) -> JsonRpcResponse {
    let params: ToolCallParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => {
            return JsonRpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {err}"));
        }
    };
    trace.tool = ToolName::parse(&params.name);
    let result = state
        .router
        .handle_tool_call(&params.name, params.arguments)
        .await
        .and_then(|output| output.into_text());
    let envelope = match result {
        Ok(text) => ToolCallResult::text(text, false),
        Err(ToolError::UnknownTool(name)) => {
            return JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("unknown tool: {name}"));
        }
        Err(err) => {
            let message = err.to_string();
            trace.tool_failed = true;
            trace.error_kind = Some(err.kind());
            trace.error_message = Some(message.clone());
            ToolCallResult::text(message, true)
        }
    };
    match serde_json::to_value(envelope) {
        Ok(value) => JsonRpcResponse::result(id, value),
        Err(_) => JsonRpcResponse::error(id, INTERNAL_ERROR, "serialization failure"),
    }
}

/// Builds the `initialize` result.
fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Serializes a response, falling back to a static internal error.
fn encode_response(response: &JsonRpcResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|_| FALLBACK_RESPONSE.to_vec())
}

/// Maps JSON-RPC error codes to stable audit labels.
const fn jsonrpc_error_kind(code: i64) -> &'static str {
    match code {
        PARSE_ERROR => "parse_error",
        INVALID_REQUEST => "invalid_request",
        METHOD_NOT_FOUND => "method_not_found",
        INVALID_PARAMS => "invalid_params",
        BODY_TOO_LARGE => "body_too_large",
        _ => "internal",
    }
}

/// Renders a request id for audit logs.
fn response_id_label(id: &Value) -> Option<String> {
    match id {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Builds the axum router for HTTP or SSE.
fn build_router(transport: ServerTransport, state: Arc<ServerState>) -> Router {
    let routes = match transport {
        ServerTransport::Sse => Router::new().route(RPC_PATH, post(handle_sse)),
        ServerTransport::Http | ServerTransport::Stdio => {
            Router::new().route(RPC_PATH, post(handle_http))
        }
    };
    routes.with_state(state)
}

/// Handles `POST /rpc` with a JSON response.
async fn handle_http(State(state): State<Arc<ServerState>>, body: Body) -> Response {
    match handle_http_body(&state, body).await {
        Ok(Some((status, body))) => {
            (status, [(CONTENT_TYPE, "application/json")], body).into_response()
        }
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(status) => status.into_response(),
    }
}

/// Handles `POST /rpc` with a single SSE event carrying the response.
async fn handle_sse(State(state): State<Arc<ServerState>>, body: Body) -> Response {
    let body = match handle_http_body(&state, body).await {
        Ok(Some((_, body))) => body,
        Ok(None) => return StatusCode::ACCEPTED.into_response(),
        Err(status) => return status.into_response(),
    };
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(1);
    let event = Event::default().event("message").data(String::from_utf8_lossy(&body));
    let _ = tx.send(Ok(event)).await;
    drop(tx);
    Sse::new(ReceiverStream::new(rx)).into_response()
}

/// Reads an HTTP body under the size limit and answers it like any other
/// request; oversized bodies get the `-32070` error envelope.
async fn handle_http_body(
    state: &ServerState,
    body: Body,
) -> Result<Option<(StatusCode, Vec<u8>)>, StatusCode> {
    match read_body(body, state.max_body_bytes).await {
        Ok(HttpBody::Complete(bytes)) => Ok(handle_payload(state, &bytes).await),
        Ok(HttpBody::Oversized(size)) => {
            Ok(Some((StatusCode::PAYLOAD_TOO_LARGE, state.reject_oversized(size))))
        }
        Err(_) => Err(StatusCode::BAD_REQUEST),
    }
}

/// Outcome of reading an HTTP request body.
#[derive(Debug, PartialEq, Eq)]
enum HttpBody {
    /// Body within the limit.
    Complete(Vec<u8>),
    /// Body exceeded the limit after this many bytes; reading stopped there.
    Oversized(usize),
}

/// Collects body frames until the stream ends or the limit is exceeded.
async fn read_body(body: Body, max_body_bytes: usize) -> Result<HttpBody, axum::Error> {
    let mut stream = body.into_data_stream();
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let size = collected.len().saturating_add(chunk.len());
        if size > max_body_bytes {
            return Ok(HttpBody::Oversized(size));
        }
        collected.extend_from_slice(&chunk);
    }
    Ok(HttpBody::Complete(collected))
}

// ============================================================================
// SECTION: Stdio Framing
// ============================================================================

/// Framing style of a stdio message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// One JSON document per line.
    Line,
    /// `Content-Length` header block followed by the body.
    ContentLength,
}

/// Result of reading one stdio message.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    /// Complete message body.
    Message {
        /// Framing the message arrived in.
        framing: Framing,
        /// Message body.
        payload: Vec<u8>,
    },
    /// Message over the body limit; its bytes were discarded.
    Oversized {
        /// Framing the message arrived in.
        framing: Framing,
        /// Observed (or declared) size.
        size: usize,
    },
    /// Input closed.
    Eof,
}

/// Reads the next message, skipping blank lines.
async fn read_message<R>(reader: &mut R, max_body_bytes: usize) -> Result<Inbound, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let limit = u64::try_from(max_body_bytes).unwrap_or(u64::MAX).saturating_add(2);
    loop {
        let mut line = Vec::new();
        let read = (&mut *reader).take(limit).read_until(b'\n', &mut line).await.map_err(io_error)?;
        if read == 0 {
            return Ok(Inbound::Eof);
        }
        let terminated = line.last() == Some(&b'\n');
        if !terminated && u64::try_from(read).unwrap_or(u64::MAX) >= limit {
            let drained = drain_line(reader).await?;
            return Ok(Inbound::Oversized {
                framing: Framing::Line,
                size: read.saturating_add(drained),
            });
        }
        let trimmed = trim_line_end(&line);
        if trimmed.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if let Some(length) = content_length(trimmed)? {
            return read_framed_body(reader, length, max_body_bytes).await;
        }
        if trimmed.len() > max_body_bytes {
            return Ok(Inbound::Oversized {
                framing: Framing::Line,
                size: trimmed.len(),
            });
        }
        return Ok(Inbound::Message {
            framing: Framing::Line,
            payload: trimmed.to_vec(),
        });
    }
}

/// Reads the remaining headers and the body of a `Content-Length` message.
async fn read_framed_body<R>(
    reader: &mut R,
    length: usize,
    max_body_bytes: usize,
) -> Result<Inbound, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = 1;
    loop {
        let mut line = Vec::new();
        let read = (&mut *reader)
            .take(MAX_HEADER_LINE_BYTES)
            .read_until(b'\n', &mut line)
            .await
            .map_err(io_error)?;
        if read == 0 {
            return Err(McpServerError::Transport("unexpected eof in message headers".to_string()));
        }
        if line.last() != Some(&b'\n') {
            return Err(McpServerError::Transport("message header too large".to_string()));
        }
        let trimmed = trim_line_end(&line);
        if trimmed.is_empty() {
            break;
        }
        if content_length(trimmed)?.is_some() {
            return Err(McpServerError::Transport("duplicate content-length header".to_string()));
        }
        headers += 1;
        if headers > MAX_HEADER_LINES {
            return Err(McpServerError::Transport("too many message headers".to_string()));
        }
    }
    if length > max_body_bytes {
        let declared = u64::try_from(length).unwrap_or(u64::MAX);
        tokio::io::copy(&mut (&mut *reader).take(declared), &mut tokio::io::sink())
            .await
            .map_err(io_error)?;
        return Ok(Inbound::Oversized {
            framing: Framing::ContentLength,
            size: length,
        });
    }
    let mut payload = vec![0_u8; length];
    reader.read_exact(&mut payload).await.map_err(io_error)?;
    Ok(Inbound::Message {
        framing: Framing::ContentLength,
        payload,
    })
}

/// Parses a `Content-Length` header line; `None` when the line is not one.
fn content_length(line: &[u8]) -> Result<Option<usize>, McpServerError> {
    let Ok(text) = std::str::from_utf8(line) else {
        return Ok(None);
    };
    let Some((name, value)) = text.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| McpServerError::Transport("invalid content-length header".to_string()))
}

/// Discards input through the next newline; returns the discarded byte count.
async fn drain_line<R>(reader: &mut R) -> Result<usize, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut total = 0_usize;
    loop {
        let mut chunk = Vec::new();
        let read = (&mut *reader)
            .take(DRAIN_CHUNK_BYTES)
            .read_until(b'\n', &mut chunk)
            .await
            .map_err(io_error)?;
        total = total.saturating_add(read);
        if read == 0 || chunk.last() == Some(&b'\n') {
            return Ok(total);
        }
    }
}

/// Strips a trailing `\n` or `\r\n`.
fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Writes responses in the framing of their request until the channel closes.
async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<(Framing, Vec<u8>)>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some((framing, bytes)) = rx.recv().await {
        write_message(&mut writer, framing, &bytes).await?;
    }
    writer.shutdown().await
}

/// Writes one framed message and flushes.
async fn write_message<W>(writer: &mut W, framing: Framing, bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match framing {
        Framing::Line => {
            writer.write_all(bytes).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", bytes.len());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(bytes).await?;
        }
    }
    writer.flush().await
}

/// Maps I/O failures to transport errors.
fn io_error(err: io::Error) -> McpServerError {
    McpServerError::Transport(err.to_string())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
