//! Tool trait and types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::schema::ExploreError;
use crate::validation::ViolationCode;

/// Per-call context handed to every tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Correlates log lines for one call.
    pub request_id: Uuid,
    /// Free-form caller label (session, client name), if known.
    pub caller: Option<String>,
}

impl ToolContext {
    pub fn new(caller: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            caller,
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Error type for tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Query rejected ({code}): {message}")]
    QueryRejected { code: ViolationCode, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited, retry after {0:?}")]
    RateLimited(Option<Duration>),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl ToolError {
    /// Stable machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParameters(_) => "INVALID_PARAMETERS",
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::QueryRejected { code, .. } => code.as_str(),
            Self::NotFound(_) => "NOT_FOUND",
            Self::SchemaUnavailable(_) => "SCHEMA_UNAVAILABLE",
            Self::ExecutionFailed(_) => "EXECUTION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::ExternalService(_) => "UPSTREAM_ERROR",
        }
    }
}

impl From<GatewayError> for ToolError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::RateLimited { retry_after } => Self::RateLimited(Some(retry_after)),
            GatewayError::SchemaFetchFailed(_) | GatewayError::SchemaParseFailed(_) => {
                Self::SchemaUnavailable(e.to_string())
            }
            GatewayError::QueryRejected { code, message } => Self::QueryRejected { code, message },
            GatewayError::SchemaWaitTimedOut(waited) => Self::Timeout(waited),
            GatewayError::ExecutorUnavailable => Self::ExecutionFailed(e.to_string()),
            GatewayError::Upstream(message) => Self::ExternalService(message),
        }
    }
}

impl From<ExploreError> for ToolError {
    fn from(e: ExploreError) -> Self {
        match e {
            ExploreError::EmptySearchTerm => Self::InvalidParameters(e.to_string()),
            _ => Self::NotFound(e.to_string()),
        }
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The result data.
    pub result: serde_json::Value,
    /// Time taken.
    pub duration: Duration,
}

impl ToolOutput {
    /// Create a successful output with a JSON result.
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    /// Serialize `value` into a successful output.
    pub fn json<T: Serialize>(value: &T, duration: Duration) -> Result<Self, ToolError> {
        let result = serde_json::to_value(value)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to encode result: {e}")))?;
        Ok(Self::success(result, duration))
    }

    /// Create a text output.
    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self::success(serde_json::Value::String(text.into()), duration)
    }
}

/// Definition of a tool's parameters using JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A callable operation exposed to LLM callers.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get a description of what the tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError>;

    /// Maximum time a call may run before the registry abandons it.
    /// Default: 30 seconds.
    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    /// Get the tool schema for LLM function calling.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Extract a required string parameter from a JSON object.
///
/// Returns `ToolError::InvalidParameters` if the key is missing or not a string.
pub fn require_str<'a>(params: &'a serde_json::Value, name: &str) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{}' parameter", name)))
}

/// Extract an optional string parameter. Present but not a string is an error.
pub fn optional_str<'a>(
    params: &'a serde_json::Value,
    name: &str,
) -> Result<Option<&'a str>, ToolError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| ToolError::InvalidParameters(format!("'{name}' must be a string"))),
    }
}

/// Registration-time validation of a tool's `parameters_schema()`.
///
/// Returns a list of validation errors. An empty list means the schema is valid.
///
/// # Rules enforced
///
/// 1. Top-level must have `"type": "object"`
/// 2. Top-level must have `"properties"` as an object
/// 3. Every key in `"required"` must exist in `"properties"`
/// 4. Nested objects follow the same rules recursively
/// 5. Array properties must have `"items"` defined
///
/// Properties without a `"type"` field are allowed (freeform), which is how
/// `execute_query` accepts arbitrary `variables`.
pub fn validate_tool_schema(schema: &serde_json::Value, path: &str) -> Vec<String> {
    let mut errors = Vec::new();

    match schema.get("type").and_then(|t| t.as_str()) {
        Some("object") => {}
        Some(other) => {
            errors.push(format!("{path}: expected type \"object\", got \"{other}\""));
            return errors;
        }
        None => {
            errors.push(format!("{path}: missing \"type\": \"object\""));
            return errors;
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        errors.push(format!("{path}: missing or non-object \"properties\""));
        return errors;
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|r| r.as_str()) {
            if !properties.contains_key(key) {
                errors.push(format!(
                    "{path}: required key \"{key}\" not found in properties"
                ));
            }
        }
    }

    for (key, prop) in properties {
        let prop_path = format!("{path}.{key}");
        match prop.get("type").and_then(|t| t.as_str()) {
            Some("object") if prop.get("properties").is_some() => {
                errors.extend(validate_tool_schema(prop, &prop_path));
            }
            Some("array") => match prop.get("items") {
                Some(items) if items.get("type").and_then(|t| t.as_str()) == Some("object") => {
                    errors.extend(validate_tool_schema(items, &format!("{prop_path}.items")));
                }
                Some(_) => {}
                None => errors.push(format!("{prop_path}: array property missing \"items\"")),
            },
            _ => {}
        }
    }

    errors
}
