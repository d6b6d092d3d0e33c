//! JSON Schema validation for comparison submissions.
//!
//! The document sent to the comparison engine is checked against an
//! embedded JSON Schema before any network call, so a malformed request is
//! reported locally with field-level detail instead of as an opaque HTTP
//! error.
//!
//! # Security Guarantees
//! - Secrets may only appear in the `password` field of an endpoint block
//! - Connection strings with embedded credentials are rejected anywhere
//!
//! # Example
//! ```rust
//! use dbcompare_core::validation::validate_submission_payload;
//! use serde_json::json;
//!
//! let incomplete = json!({ "formatVersion": "1.0" });
//! assert!(validate_submission_payload(&incomplete).is_err());
//! ```

use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// JSON Schema validation errors with field-level reporting
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema compilation failed during initialization
    #[error("JSON Schema compilation failed: {message}")]
    SchemaCompilation { message: String },

    /// Validation failed with specific field errors
    #[error("Submission validation failed with {error_count} errors: {errors:?}")]
    ValidationFailed {
        error_count: usize,
        errors: Vec<String>,
    },

    /// Unsupported format version detected
    #[error("Unsupported format version '{version}'. Supported versions: {supported:?}")]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    /// A secret appears outside an endpoint's password field
    #[error("Security validation failed: {reason}")]
    SecurityViolation { reason: String },
}

/// Supported submission format versions
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Fields that may legitimately carry a secret
const SECRET_FIELDS: &[&str] = &["password"];

/// Blocks that may contain a secret field
const ENDPOINT_BLOCKS: &[&str] = &["sourceConfig", "targetConfig"];

/// Embedded JSON Schema for v1.0 submissions
const SUBMISSION_SCHEMA_V1_0: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "DBCompare comparison submission v1.0",
  "type": "object",
  "required": [
    "formatVersion",
    "requestId",
    "assembledAt",
    "sourceConfig",
    "targetConfig",
    "comparisonConfig"
  ],
  "properties": {
    "formatVersion": { "type": "string", "pattern": "^1\\.0$" },
    "requestId": { "type": "string", "minLength": 1 },
    "assembledAt": { "type": "string", "minLength": 1 },
    "sourceConfig": { "$ref": "#/$defs/endpoint" },
    "targetConfig": { "$ref": "#/$defs/endpoint" },
    "comparisonConfig": {
      "type": "object",
      "required": [
        "caseSensitive",
        "ignoreWhitespace",
        "ignoreNulls",
        "stringSimilarityThreshold",
        "numericTolerance",
        "tableMappings"
      ],
      "properties": {
        "caseSensitive": { "type": "boolean" },
        "ignoreWhitespace": { "type": "boolean" },
        "ignoreNulls": { "type": "boolean" },
        "stringSimilarityThreshold": { "type": "number", "minimum": 0, "maximum": 1 },
        "numericTolerance": { "type": "number", "minimum": 0 },
        "tableMappings": {
          "type": "array",
          "minItems": 1,
          "items": { "$ref": "#/$defs/tableMapping" }
        }
      }
    }
  },
  "$defs": {
    "endpoint": {
      "type": "object",
      "required": ["dbType", "host", "port", "schema", "username", "password"],
      "properties": {
        "dbType": { "enum": ["mysql", "postgresql", "oracle", "sqlserver"] },
        "host": { "type": "string", "minLength": 1 },
        "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
        "schema": { "type": "string", "minLength": 1 },
        "username": { "type": "string", "minLength": 1 },
        "password": { "type": "string" },
        "schemaFilter": { "type": "string", "pattern": "^[A-Za-z][A-Za-z0-9_$#]*$" }
      },
      "if": { "properties": { "dbType": { "const": "oracle" } } },
      "then": { "required": ["schemaFilter"] }
    },
    "tableMapping": {
      "type": "object",
      "required": ["sourceTable", "targetTable", "keyColumns", "columnMappings"],
      "properties": {
        "sourceTable": { "type": "string", "minLength": 1 },
        "targetTable": { "type": "string", "minLength": 1 },
        "keyColumns": {
          "type": "array",
          "minItems": 1,
          "items": { "type": "string", "minLength": 1 }
        },
        "columnMappings": {
          "type": "array",
          "items": { "$ref": "#/$defs/columnMapping" }
        }
      }
    },
    "columnMapping": {
      "type": "object",
      "required": ["sourceColumn", "targetColumn", "isKey", "transformationType"],
      "properties": {
        "sourceColumn": { "type": "string", "minLength": 1 },
        "targetColumn": { "type": "string", "minLength": 1 },
        "isKey": { "type": "boolean" },
        "transformationType": {
          "enum": ["none", "trim", "uppercase", "lowercase", "custom"]
        },
        "customTransformation": { "type": "string", "minLength": 1 }
      },
      "if": { "properties": { "transformationType": { "const": "custom" } } },
      "then": { "required": ["customTransformation"] }
    }
  }
}"##;

/// Compiled JSON Schema instance (initialized once)
static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Initialize and compile the submission JSON Schema.
///
/// Safe to call more than once; later calls are no-ops.
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded schema is invalid.
pub fn initialize_schema_validator() -> Result<(), ValidationError> {
    if COMPILED_SCHEMA.get().is_some() {
        return Ok(());
    }

    let schema_json = get_schema_definition()?;
    let compiled = jsonschema::validator_for(&schema_json).map_err(|e| {
        ValidationError::SchemaCompilation {
            message: format!("Schema compilation error: {e}"),
        }
    })?;

    // Another thread may have won the race; either instance is equivalent
    let _ = COMPILED_SCHEMA.set(compiled);

    Ok(())
}

fn compiled_schema() -> Result<&'static Validator, ValidationError> {
    initialize_schema_validator()?;
    COMPILED_SCHEMA
        .get()
        .ok_or_else(|| ValidationError::SchemaCompilation {
            message: "Schema validator not initialized".to_string(),
        })
}

/// Validate a submission document against the embedded JSON Schema.
///
/// Checks, in order: format version, schema structure, then secret
/// placement.
///
/// # Errors
/// Returns a `ValidationError` describing every schema violation found, or
/// the first version or security problem.
pub fn validate_submission_payload(json_value: &Value) -> Result<(), ValidationError> {
    let schema = compiled_schema()?;

    validate_format_version(json_value)?;

    let errors: Vec<String> = schema
        .iter_errors(json_value)
        .map(|error| error.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ValidationError::ValidationFailed {
            error_count: errors.len(),
            errors,
        });
    }

    validate_secret_placement(json_value, "")?;
    validate_no_connection_strings(json_value, "")?;

    Ok(())
}

fn validate_format_version(json_value: &Value) -> Result<(), ValidationError> {
    let version = json_value
        .get("formatVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::ValidationFailed {
            error_count: 1,
            errors: vec!["Missing required field 'formatVersion'".to_string()],
        })?;

    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(ValidationError::UnsupportedVersion {
            version: version.to_string(),
            supported: SUPPORTED_VERSIONS.iter().map(|s| s.to_string()).collect(),
        });
    }

    Ok(())
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Secret-named fields are only allowed directly inside an endpoint block.
fn validate_secret_placement(value: &Value, path: &str) -> Result<(), ValidationError> {
    match value {
        Value::Object(obj) => {
            for (key, val) in obj {
                let lower_key = key.to_lowercase();
                let looks_secret = lower_key.contains("password")
                    || lower_key.contains("secret")
                    || lower_key.contains("token");
                let allowed = SECRET_FIELDS.contains(&key.as_str())
                    && ENDPOINT_BLOCKS.contains(&path);
                if looks_secret && !allowed {
                    return Err(ValidationError::SecurityViolation {
                        reason: format!(
                            "Credential-related field '{}' outside an endpoint block",
                            child_path(path, key)
                        ),
                    });
                }
                validate_secret_placement(val, &child_path(path, key))?;
            }
        }
        Value::Array(arr) => {
            for (index, item) in arr.iter().enumerate() {
                validate_secret_placement(item, &format!("{path}[{index}]"))?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn connection_string_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)^(postgres|postgresql|mysql|oracle|sqlserver|jdbc:[a-z]+)://[^/\s:@]+:[^@\s]+@")
                .ok()
        })
        .as_ref()
}

fn validate_no_connection_strings(value: &Value, path: &str) -> Result<(), ValidationError> {
    match value {
        Value::String(s) => {
            let matched = connection_string_pattern().is_some_and(|pattern| pattern.is_match(s));
            if matched {
                return Err(ValidationError::SecurityViolation {
                    reason: format!("Connection string with credentials found at path '{path}'"),
                });
            }
        }
        Value::Object(obj) => {
            for (key, val) in obj {
                validate_no_connection_strings(val, &child_path(path, key))?;
            }
        }
        Value::Array(arr) => {
            for (index, item) in arr.iter().enumerate() {
                validate_no_connection_strings(item, &format!("{path}[{index}]"))?;
            }
        }
        _ => {}
    }

    Ok(())
}

/// Get the embedded JSON Schema as a parsed Value for external use.
///
/// # Errors
/// Returns `SchemaCompilation` if the embedded schema is not valid JSON.
pub fn get_schema_definition() -> Result<Value, ValidationError> {
    serde_json::from_str(SUBMISSION_SCHEMA_V1_0).map_err(|e| ValidationError::SchemaCompilation {
        message: format!("Failed to parse embedded schema: {e}"),
    })
}
