//! Tool input schema validation tests for akave-mcp-contract.
// crates/akave-mcp-contract/tests/schema_validation.rs
// =============================================================================
// Module: Tool Schema Validation Tests
// Description: Compile every tool schema and probe accepted/rejected inputs.
// Purpose: Ensure the declarative tool contract rejects malformed arguments.
// =============================================================================

use akave_mcp_contract::ToolName;
use akave_mcp_contract::tool_definition;
use akave_mcp_contract::tool_definitions;
use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use serde_json::json;

type TestResult = Result<(), String>;

fn compile(name: ToolName) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&tool_definition(name).input_schema)
        .map_err(|err| format!("{name}: {err}"))
}

fn expect_valid(name: ToolName, input: &Value) -> TestResult {
    if compile(name)?.is_valid(input) {
        Ok(())
    } else {
        Err(format!("{name} rejected {input}"))
    }
}

fn expect_invalid(name: ToolName, input: &Value) -> TestResult {
    if compile(name)?.is_valid(input) {
        Err(format!("{name} accepted {input}"))
    } else {
        Ok(())
    }
}

#[test]
fn every_tool_schema_compiles() -> TestResult {
    for definition in tool_definitions() {
        compile(definition.name)?;
    }
    Ok(())
}

#[test]
fn list_buckets_accepts_empty_arguments_only() -> TestResult {
    expect_valid(ToolName::ListBuckets, &json!({}))?;
    expect_invalid(ToolName::ListBuckets, &json!({"bucket": "extra"}))?;
    Ok(())
}

#[test]
fn object_tools_require_non_empty_bucket_and_key() -> TestResult {
    for name in [ToolName::GetObject, ToolName::FetchHeaders, ToolName::DeleteObject] {
        expect_valid(name, &json!({"bucket": "t1", "key": "a.json"}))?;
        expect_invalid(name, &json!({"bucket": "t1"}))?;
        expect_invalid(name, &json!({"bucket": "", "key": "a.json"}))?;
        expect_invalid(name, &json!({"bucket": "t1", "key": ""}))?;
        expect_invalid(name, &json!({"bucket": 7, "key": "a.json"}))?;
    }
    Ok(())
}

#[test]
fn put_and_update_require_string_body() -> TestResult {
    for name in [ToolName::PutObject, ToolName::UpdateObject] {
        expect_valid(name, &json!({"bucket": "t1", "key": "k", "body": ""}))?;
        expect_invalid(name, &json!({"bucket": "t1", "key": "k"}))?;
        expect_invalid(name, &json!({"bucket": "t1", "key": "k", "body": {"x": 1}}))?;
    }
    Ok(())
}

#[test]
fn copy_object_requires_all_four_locations() -> TestResult {
    let full = json!({
        "sourceBucket": "a",
        "sourceKey": "k",
        "destinationBucket": "b",
        "destinationKey": "k2"
    });
    expect_valid(ToolName::CopyObject, &full)?;
    expect_invalid(
        ToolName::CopyObject,
        &json!({"sourceBucket": "a", "sourceKey": "k", "destinationBucket": "b"}),
    )?;
    expect_invalid(
        ToolName::CopyObject,
        &json!({"source_bucket": "a", "sourceKey": "k", "destinationBucket": "b", "destinationKey": "k"}),
    )?;
    Ok(())
}

#[test]
fn prefix_is_optional_for_listings() -> TestResult {
    for name in [ToolName::ListObjects, ToolName::ListObjectVersions] {
        expect_valid(name, &json!({"bucket": "t1"}))?;
        expect_valid(name, &json!({"bucket": "t1", "prefix": "docs/"}))?;
        expect_invalid(name, &json!({"prefix": "docs/"}))?;
    }
    Ok(())
}

#[test]
fn signed_url_expiry_rejects_zero_negative_and_oversized() -> TestResult {
    let base = |expires: Value| json!({"bucket": "t1", "key": "k", "expiresIn": expires});
    expect_valid(ToolName::GetSignedUrl, &json!({"bucket": "t1", "key": "k"}))?;
    expect_valid(ToolName::GetSignedUrl, &base(json!(10)))?;
    expect_valid(ToolName::GetSignedUrl, &base(json!(604_800)))?;
    expect_invalid(ToolName::GetSignedUrl, &base(json!(0)))?;
    expect_invalid(ToolName::GetSignedUrl, &base(json!(-5)))?;
    expect_invalid(ToolName::GetSignedUrl, &base(json!(604_801)))?;
    expect_invalid(ToolName::GetSignedUrl, &base(json!(1.5)))?;
    expect_invalid(ToolName::GetSignedUrl, &base(json!("60")))?;
    Ok(())
}
