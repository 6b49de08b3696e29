//! Query tools: validate and execute.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::gateway::Gateway;
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, require_str};

/// Check a query against the schema and the safety policy without running it.
pub struct ValidateQueryTool {
    gateway: Arc<Gateway>,
}

impl ValidateQueryTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ValidateQueryTool {
    fn name(&self) -> &str {
        "validate_query"
    }

    fn description(&self) -> &str {
        "Validate a GraphQL query without executing it. Checks syntax and field names against \
         the schema, rejects mutations and subscriptions, enforces a maximum depth of 15 and \
         blocks any selection that reaches secret data. Returns {valid, operationType, \
         operationName, depth} or {valid: false, code, error}."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "GraphQL query document"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let query = require_str(&params, "query")?;

        let result = self.gateway.validate_query(query).await?;
        ToolOutput::json(&result, start.elapsed())
    }
}

/// Validate a query and, if accepted, run it against the upstream endpoint.
pub struct ExecuteQueryTool {
    gateway: Arc<Gateway>,
}

impl ExecuteQueryTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ExecuteQueryTool {
    fn name(&self) -> &str {
        "execute_query"
    }

    fn description(&self) -> &str {
        "Execute a read-only GraphQL query. The query is validated first (same rules as \
         validate_query) and is only sent upstream when it passes. Returns {data, errors}."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "GraphQL query document"
                },
                "variables": {
                    "description": "Variables object, or a JSON string encoding one"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let query = require_str(&params, "query")?;
        let variables = parse_variables(params.get("variables"))?;

        tracing::debug!(request_id = %ctx.request_id, "Executing validated query");
        let response = self.gateway.execute_query(query, variables).await?;
        ToolOutput::json(&response, start.elapsed())
    }

    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}

/// Accept an object, a JSON-encoded object string, or nothing.
fn parse_variables(value: Option<&serde_json::Value>) -> Result<serde_json::Value, ToolError> {
    let value = match value {
        None | Some(serde_json::Value::Null) => return Ok(serde_json::json!({})),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
            return Ok(serde_json::json!({}));
        }
        Some(serde_json::Value::String(s)) => serde_json::from_str(s).map_err(|e| {
            ToolError::InvalidParameters(format!("'variables' is not valid JSON: {e}"))
        })?,
        Some(other) => other.clone(),
    };

    if !value.is_object() {
        return Err(ToolError::InvalidParameters(
            "'variables' must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}
