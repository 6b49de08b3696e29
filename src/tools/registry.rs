//! Tool registry: name lookup, schema checks at registration, and dispatch
//! with a per-tool timeout.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::gateway::Gateway;
use crate::tools::builtin::{
    ExecuteQueryTool, GetEnumTool, GetFieldTool, GetInterfaceImplementorsTool, GetTypeTool,
    GetUnionMembersTool, ListMutationsTool, ListQueriesTool, ListTypesTool, SearchSchemaTool,
    ValidateQueryTool,
};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, ToolSchema, validate_tool_schema};

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Rejects malformed parameter schemas and duplicate
    /// names.
    pub async fn register(&self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        let errors = validate_tool_schema(&tool.parameters_schema(), &name);
        if !errors.is_empty() {
            return Err(ToolError::InvalidParameters(format!(
                "tool '{name}' has an invalid parameter schema: {}",
                errors.join("; ")
            )));
        }

        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            return Err(ToolError::InvalidParameters(format!(
                "tool '{name}' is already registered"
            )));
        }
        tracing::debug!(tool = %name, "Registered tool");
        tools.insert(name, tool);
        Ok(())
    }

    /// Register the full gateway tool surface over `gateway`.
    pub async fn register_gateway_tools(&self, gateway: Arc<Gateway>) -> Result<(), ToolError> {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ValidateQueryTool::new(Arc::clone(&gateway))),
            Arc::new(ExecuteQueryTool::new(Arc::clone(&gateway))),
            Arc::new(ListTypesTool::new(Arc::clone(&gateway))),
            Arc::new(GetTypeTool::new(Arc::clone(&gateway))),
            Arc::new(ListQueriesTool::new(Arc::clone(&gateway))),
            Arc::new(ListMutationsTool::new(Arc::clone(&gateway))),
            Arc::new(GetFieldTool::new(Arc::clone(&gateway))),
            Arc::new(GetEnumTool::new(Arc::clone(&gateway))),
            Arc::new(SearchSchemaTool::new(Arc::clone(&gateway))),
            Arc::new(GetInterfaceImplementorsTool::new(Arc::clone(&gateway))),
            Arc::new(GetUnionMembersTool::new(gateway)),
        ];
        for tool in tools {
            self.register(tool).await?;
        }
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn all(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.read().await.values().cloned().collect()
    }

    /// Schemas of every tool, sorted by name.
    pub async fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.all().await.iter().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub async fn count(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Look up `name` and run it, bounded by the tool's execution timeout.
    pub async fn dispatch(
        &self,
        name: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .await
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let timeout = tool.execution_timeout();
        tracing::debug!(tool = %name, request_id = %ctx.request_id, "Dispatching tool call");

        let outcome = match tokio::time::timeout(timeout, tool.execute(params, ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolError::Timeout(timeout)),
        };

        match &outcome {
            Ok(output) => tracing::debug!(
                tool = %name,
                request_id = %ctx.request_id,
                elapsed = ?output.duration,
                "Tool call succeeded"
            ),
            Err(e) => tracing::warn!(
                tool = %name,
                request_id = %ctx.request_id,
                code = e.code(),
                error = %e,
                "Tool call failed"
            ),
        }
        outcome
    }
}
