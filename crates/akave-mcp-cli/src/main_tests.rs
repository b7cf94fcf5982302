// crates/akave-mcp-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and serve overrides.
// Purpose: Ensure command-line overrides reach the server configuration.
// Dependencies: akave-mcp-cli main helpers
// ============================================================================

//! ## Overview
//! Validates clap parsing for each subcommand and that `serve` overrides are
//! applied before validation.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use akave_mcp_config::AkaveConfig;
use akave_mcp_config::ServerTransport;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::ServeCommand;
use super::ToolsCommand;
use super::TransportArg;
use super::apply_serve_overrides;
use super::load_serve_config;
use super::load_serve_config_with;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const CREDENTIALS: &str = r#"
[storage]
endpoint = "https://o3-rc2.akave.xyz"
access_key_id = "key"
secret_access_key = "secret"
"#;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn parses_serve_with_overrides() {
    let cli = Cli::try_parse_from([
        "akave-mcp",
        "serve",
        "--transport",
        "http",
        "--bind",
        "127.0.0.1:9000",
    ])
    .unwrap();
    let Some(Commands::Serve(command)) = cli.command else {
        panic!("expected serve command");
    };
    assert_eq!(command.transport, Some(TransportArg::Http));
    assert_eq!(command.bind.as_deref(), Some("127.0.0.1:9000"));
}

#[test]
fn parses_config_validate_and_tools_list() {
    let cli = Cli::try_parse_from(["akave-mcp", "config", "validate", "--config", "a.toml"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommand::Validate(_)
        })
    ));
    let cli = Cli::try_parse_from(["akave-mcp", "tools", "list"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Tools {
            command: ToolsCommand::List
        })
    ));
}

#[test]
fn rejects_unknown_transport() {
    assert!(Cli::try_parse_from(["akave-mcp", "serve", "--transport", "grpc"]).is_err());
}

#[test]
fn overrides_replace_transport_and_bind() {
    let mut config = AkaveConfig::from_toml_str(CREDENTIALS).unwrap();
    apply_serve_overrides(&mut config, Some(TransportArg::Sse), Some("127.0.0.1:8080"));
    assert_eq!(config.server.transport, ServerTransport::Sse);
    assert_eq!(config.server.bind.as_deref(), Some("127.0.0.1:8080"));
    config.validate().unwrap();
}

#[test]
fn http_override_without_bind_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("akave-mcp.toml");
    std::fs::write(&path, CREDENTIALS).unwrap();
    let command = ServeCommand {
        config: Some(path),
        transport: Some(TransportArg::Http),
        bind: None,
    };
    let err = load_serve_config(&command).unwrap_err();
    assert!(err.to_string().contains("bind"));
}

#[test]
fn bind_override_completes_http_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("akave-mcp.toml");
    std::fs::write(&path, format!("{CREDENTIALS}\n[server]\ntransport = \"http\"\n")).unwrap();
    let command = ServeCommand {
        config: Some(path),
        transport: None,
        bind: Some("127.0.0.1:9000".to_string()),
    };
    let config = load_serve_config_with(&command, |_| None).unwrap();
    assert_eq!(config.server.transport, ServerTransport::Http);
    assert_eq!(config.server.bind_addr().unwrap().port(), 9000);
}

#[test]
fn stdio_override_replaces_invalid_http_bind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("akave-mcp.toml");
    std::fs::write(
        &path,
        format!("{CREDENTIALS}\n[server]\ntransport = \"http\"\nbind = \"0.0.0.0:8080\"\n"),
    )
    .unwrap();
    let command = ServeCommand {
        config: Some(path),
        transport: Some(TransportArg::Stdio),
        bind: None,
    };
    let config = load_serve_config_with(&command, |_| None).unwrap();
    assert_eq!(config.server.transport, ServerTransport::Stdio);
}
