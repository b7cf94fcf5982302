// crates/akave-mcp/src/normalize.rs
// ============================================================================
// Module: Content Normalization
// Description: Extension-driven normalization of object content for transport.
// Purpose: Deliver readable, stable text for text-like objects.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Object bytes cross the bridge as text. The policy applied depends only on
//! the key's extension and is a pure lookup:
//! - text-like extensions decode UTF-8, strip a leading BOM, and trim;
//! - `.json` additionally re-serializes valid JSON with 2-space indentation;
//! - everything else is decoded lossily without further changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Unicode byte-order mark.
const BOM: char = '\u{feff}';

/// Extensions treated as cleaned text, paired with their content type.
const TEXT_EXTENSIONS: &[(&str, &str)] = &[
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("log", "text/plain"),
    ("csv", "text/csv"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("toml", "application/toml"),
    ("xml", "application/xml"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("ts", "text/plain"),
    ("tsx", "text/plain"),
    ("jsx", "text/plain"),
    ("py", "text/x-python"),
    ("rs", "text/plain"),
    ("go", "text/plain"),
    ("java", "text/plain"),
    ("c", "text/plain"),
    ("h", "text/plain"),
    ("cpp", "text/plain"),
    ("sql", "text/plain"),
    ("sh", "text/x-shellscript"),
    ("bash", "text/x-shellscript"),
    ("zsh", "text/x-shellscript"),
];

/// JSON content type.
const JSON_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Normalization policy selected by object extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationPolicy {
    /// Lossy decode only.
    None,
    /// Decode, strip BOM, trim whitespace.
    TextClean,
    /// Text cleaning plus 2-space JSON re-serialization.
    JsonPretty,
}

impl NormalizationPolicy {
    /// Selects the policy for an object key.
    #[must_use]
    pub fn for_key(key: &str) -> Self {
        match extension(key).as_deref() {
            Some("json") => Self::JsonPretty,
            Some(ext) if text_content_type(ext).is_some() => Self::TextClean,
            _ => Self::None,
        }
    }

    /// Applies the policy to raw object bytes.
    #[must_use]
    pub fn apply(self, bytes: &[u8]) -> String {
        let decoded = String::from_utf8_lossy(bytes);
        match self {
            Self::None => decoded.into_owned(),
            Self::TextClean => clean_text(&decoded).to_string(),
            Self::JsonPretty => {
                let cleaned = clean_text(&decoded);
                serde_json::from_str::<Value>(cleaned)
                    .ok()
                    .and_then(|value| serde_json::to_string_pretty(&value).ok())
                    .unwrap_or_else(|| cleaned.to_string())
            }
        }
    }
}

/// Normalizes object bytes using the policy for `key`.
#[must_use]
pub fn normalize_content(key: &str, bytes: &[u8]) -> String {
    NormalizationPolicy::for_key(key).apply(bytes)
}

/// Returns the content type to record when writing `key`, if known.
#[must_use]
pub fn content_type_for(key: &str) -> Option<&'static str> {
    match extension(key).as_deref() {
        Some("json") => Some(JSON_CONTENT_TYPE),
        Some(ext) => text_content_type(ext),
        None => None,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the lowercase extension of the final key segment.
fn extension(key: &str) -> Option<String> {
    let name = key.rsplit('/').next().unwrap_or(key);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Looks up a text extension.
fn text_content_type(ext: &str) -> Option<&'static str> {
    TEXT_EXTENSIONS.iter().find(|(candidate, _)| *candidate == ext).map(|(_, ty)| *ty)
}

/// Strips byte-order marks and whitespace from both ends.
fn clean_text(text: &str) -> &str {
    text.trim_matches(|ch: char| ch == BOM || ch.is_whitespace())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
