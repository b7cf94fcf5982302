// crates/akave-mcp-config/src/config.rs
// ============================================================================
// Module: Akave MCP Configuration
// Description: Configuration loading and validation for the Akave MCP bridge.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is assembled once at startup from an optional TOML file and an
//! environment overlay carrying the storage endpoint and static credentials.
//! Missing credentials fail closed and are reported together so operators can
//! fix every gap in one pass. Environment access goes through a caller-supplied
//! lookup so business logic never reads ambient process state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "akave-mcp.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "AKAVE_MCP_CONFIG";
/// Environment variable carrying the storage endpoint URL.
pub const ENDPOINT_ENV_VAR: &str = "AKAVE_ENDPOINT_URL";
/// Environment variable carrying the access key identifier.
pub const ACCESS_KEY_ID_ENV_VAR: &str = "AKAVE_ACCESS_KEY_ID";
/// Environment variable carrying the secret access key.
pub const SECRET_ACCESS_KEY_ENV_VAR: &str = "AKAVE_SECRET_ACCESS_KEY";
/// Environment variable overriding the signing region.
pub const REGION_ENV_VAR: &str = "AKAVE_REGION";
/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum request body size for MCP transports.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Hard ceiling for the request body size.
pub(crate) const MAX_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
/// Default maximum object size relayed through `get_object`.
pub(crate) const DEFAULT_MAX_OBJECT_BYTES: usize = 16 * 1024 * 1024;
/// Hard ceiling for relayed object sizes.
pub(crate) const MAX_MAX_OBJECT_BYTES: usize = 512 * 1024 * 1024;
/// Default per-call backend timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Minimum per-call backend timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum per-call backend timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Akave MCP bridge configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AkaveConfig {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

impl AkaveConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| env::var(name).ok())
    }

    /// Loads configuration with an explicit environment lookup.
    ///
    /// The file is optional unless named explicitly (argument or
    /// [`CONFIG_ENV_VAR`]); environment values override file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::load_unvalidated_with(path, lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file and environment overlay without validating, so callers
    /// can apply further overrides and validate once afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be resolved, read, or parsed.
    pub fn load_unvalidated_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match resolve_path(path, &lookup)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env(&lookup);
        Ok(config)
    }

    /// Parses configuration from TOML text without validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads and parses a configuration file with size and encoding limits.
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Applies environment overrides for storage settings.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|value| value.trim().to_string());
        if let Some(endpoint) = read(ENDPOINT_ENV_VAR) {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(access_key_id) = read(ACCESS_KEY_ID_ENV_VAR) {
            self.storage.access_key_id = Some(access_key_id);
        }
        if let Some(secret) = read(SECRET_ACCESS_KEY_ENV_VAR) {
            self.storage.secret_access_key = Some(secret);
        }
        if let Some(region) = read(REGION_ENV_VAR).filter(|value| !value.is_empty()) {
            self.storage.region = region;
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        self.server.validate()
    }
}

// ============================================================================
// SECTION: Storage Configuration
// ============================================================================

/// S3-compatible backend configuration.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend endpoint URL (`http://` or `https://`).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static access key identifier.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Static secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Signing region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Force path-style addressing (required by most non-AWS endpoints).
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
    /// Maximum object size relayed through `get_object`.
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            region: default_region(),
            force_path_style: default_force_path_style(),
            max_object_bytes: default_max_object_bytes(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .field("max_object_bytes", &self.max_object_bytes)
            .finish()
    }
}

/// Resolved, non-empty backend credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    /// Backend endpoint URL.
    pub endpoint: String,
    /// Static access key identifier.
    pub access_key_id: String,
    /// Static secret access key.
    pub secret_access_key: String,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StorageCredentials")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl StorageConfig {
    /// Returns the required credentials, listing every missing one on failure.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when any required value is absent or blank.
    pub fn credentials(&self) -> Result<StorageCredentials, ConfigError> {
        let endpoint = non_blank(self.endpoint.as_deref());
        let access_key_id = non_blank(self.access_key_id.as_deref());
        let secret_access_key = non_blank(self.secret_access_key.as_deref());
        match (endpoint, access_key_id, secret_access_key) {
            (Some(endpoint), Some(access_key_id), Some(secret_access_key)) => {
                Ok(StorageCredentials {
                    endpoint: endpoint.to_string(),
                    access_key_id: access_key_id.to_string(),
                    secret_access_key: secret_access_key.to_string(),
                })
            }
            (endpoint, access_key_id, secret_access_key) => {
                let mut missing = Vec::new();
                if endpoint.is_none() {
                    missing.push(ENDPOINT_ENV_VAR);
                }
                if access_key_id.is_none() {
                    missing.push(ACCESS_KEY_ID_ENV_VAR);
                }
                if secret_access_key.is_none() {
                    missing.push(SECRET_ACCESS_KEY_ENV_VAR);
                }
                Err(ConfigError::Missing(missing))
            }
        }
    }

    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let credentials = self.credentials()?;
        let endpoint = credentials.endpoint.as_str();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "storage.endpoint must include http:// or https://".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.region must be non-empty".to_string()));
        }
        if self.max_object_bytes == 0 || self.max_object_bytes > MAX_MAX_OBJECT_BYTES {
            return Err(ConfigError::Invalid(format!(
                "storage.max_object_bytes must be between 1 and {MAX_MAX_OBJECT_BYTES}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server Configuration
// ============================================================================

/// Supported MCP transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
    /// Use SSE transport for responses.
    Sse,
}

impl ServerTransport {
    /// Returns a stable label for the transport.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
            Self::Sse => "sse",
        }
    }
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP or SSE transports.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-call backend timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            request_timeout_ms: default_request_timeout_ms(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_MAX_BODY_BYTES}"
            )));
        }
        validate_timeout_range(
            "server.request_timeout_ms",
            self.request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )?;
        self.audit.validate()?;
        match self.transport {
            ServerTransport::Http | ServerTransport::Sse => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http/sse transport requires bind address".to_string(),
                    ));
                }
                let addr: SocketAddr = bind
                    .parse()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
                if !addr.ip().is_loopback() {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind disallowed without auth".to_string(),
                    ));
                }
            }
            ServerTransport::Stdio => {}
        }
        Ok(())
    }

    /// Returns the parsed bind address for network transports.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the bind address is absent or malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .as_deref()
            .map(str::trim)
            .filter(|bind| !bind.is_empty())
            .ok_or_else(|| ConfigError::Invalid("bind address required".to_string()))?
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Whether audit events are emitted.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional JSON-lines file; stderr when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Required values absent from both file and environment.
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default signing region.
fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Path-style addressing is on unless disabled.
const fn default_force_path_style() -> bool {
    true
}

/// Default maximum relayed object size.
const fn default_max_object_bytes() -> usize {
    DEFAULT_MAX_OBJECT_BYTES
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default per-call timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Audit events are on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI, environment, or the default filename.
///
/// Returns `None` when no path was named and the default file is absent.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR).filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates a path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a millisecond value against an inclusive range.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Returns the trimmed value when it is non-empty.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
