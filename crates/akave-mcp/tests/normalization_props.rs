// crates/akave-mcp/tests/normalization_props.rs
// ============================================================================
// Module: Normalization Property-Based Tests
// Description: Randomized checks for extension-driven content normalization.
// Purpose: Ensure cleaned text and re-serialized JSON hold for any input.
// Dependencies: akave-mcp, proptest
// ============================================================================

//! ## Overview
//! - Text-like keys never yield leading BOMs or surrounding whitespace.
//! - Valid JSON under `.json` keys re-parses to the same value.
//! - Object keys keep their source order.
//! - Unknown extensions pass decoded text through untouched.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions are permitted."
)]

use akave_mcp::normalize_content;
use proptest::prelude::*;
use serde_json::Value;

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            object_entries(inner).prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Object entries with unique keys in generation order, which is rarely sorted.
fn object_entries<S>(inner: S) -> impl Strategy<Value = Vec<(String, Value)>>
where
    S: Strategy<Value = Value>,
{
    prop::collection::vec(("[a-z]{1,6}", inner), 0..5).prop_map(|pairs| {
        let mut entries: Vec<(String, Value)> = Vec::new();
        for (key, value) in pairs {
            if !entries.iter().any(|(existing, _)| *existing == key) {
                entries.push((key, value));
            }
        }
        entries
    })
}

proptest! {
    #[test]
    fn text_keys_are_cleaned(body in "\u{feff}?[ \t\n]{0,4}.{0,40}[ \t\r\n]{0,4}") {
        let output = normalize_content("notes/readme.md", body.as_bytes());
        let bom = '\u{feff}';
        prop_assert!(!output.starts_with(bom));
        prop_assert_eq!(output.trim(), output.as_str());
    }

    #[test]
    fn json_keys_round_trip_to_same_value(value in json_value()) {
        let raw = serde_json::to_string(&value).unwrap();
        let output = normalize_content("data/a.json", raw.as_bytes());
        let reparsed: Value = serde_json::from_str(&output).unwrap();
        prop_assert_eq!(reparsed, value.clone());
        prop_assert_eq!(output, serde_json::to_string_pretty(&value).unwrap());
    }

    #[test]
    fn json_keys_keep_source_order(entries in object_entries(json_value())) {
        let expected: Vec<String> = entries.iter().map(|(key, _)| key.clone()).collect();
        let body = entries
            .iter()
            .map(|(key, value)| format!("{}:{}", Value::from(key.as_str()), value))
            .collect::<Vec<_>>()
            .join(",");
        let output = normalize_content("data/a.json", format!("{{{body}}}").as_bytes());
        let reparsed: Value = serde_json::from_str(&output).unwrap();
        let keys: Vec<String> = reparsed.as_object().unwrap().keys().cloned().collect();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn unknown_extensions_pass_through(body in ".{0,64}") {
        let output = normalize_content("blob.bin", body.as_bytes());
        prop_assert_eq!(output, body);
    }
}
