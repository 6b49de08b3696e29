//! Schema exploration tools. All are read-only views over the cached index
//! and all pass through the gateway's rate limiter.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::gateway::Gateway;
use crate::schema::TypeKind;
use crate::schema::explore::{self, DEFAULT_SEARCH_LIMIT};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, optional_str, require_str};

const MAX_SEARCH_LIMIT: u64 = 200;

fn name_param(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": description }
        },
        "required": ["name"]
    })
}

fn no_params() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

pub struct ListTypesTool {
    gateway: Arc<Gateway>,
}

impl ListTypesTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ListTypesTool {
    fn name(&self) -> &str {
        "list_types"
    }

    fn description(&self) -> &str {
        "List the named types in the schema with their kind and a short description. \
         Optionally filter by kind."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "kind": {
                    "type": "string",
                    "enum": ["OBJECT", "INTERFACE", "UNION", "ENUM", "INPUT_OBJECT", "SCALAR"],
                    "description": "Only list types of this kind"
                }
            }
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let kind = optional_str(&params, "kind")?
            .map(|k| {
                TypeKind::parse(k)
                    .ok_or_else(|| ToolError::InvalidParameters(format!("unknown kind '{k}'")))
            })
            .transpose()?;

        let types = self.gateway.explore(|index| explore::list_types(index, kind)).await?;
        ToolOutput::json(&types, start.elapsed())
    }
}

pub struct GetTypeTool {
    gateway: Arc<Gateway>,
}

impl GetTypeTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GetTypeTool {
    fn name(&self) -> &str {
        "get_type"
    }

    fn description(&self) -> &str {
        "Describe one type: kind, description, fields with arguments, input fields, enum \
         values, and union members or interface implementors."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_param("Type name, e.g. Team")
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let name = require_str(&params, "name")?;
        let detail = self.gateway.explore(|index| explore::get_type(index, name)).await??;
        ToolOutput::json(&detail, start.elapsed())
    }
}

pub struct ListQueriesTool {
    gateway: Arc<Gateway>,
}

impl ListQueriesTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ListQueriesTool {
    fn name(&self) -> &str {
        "list_queries"
    }

    fn description(&self) -> &str {
        "List the fields available on the query root: the entry points for queries."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_params()
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let fields = self.gateway.explore(explore::list_queries).await?;
        ToolOutput::json(&fields, start.elapsed())
    }
}

pub struct ListMutationsTool {
    gateway: Arc<Gateway>,
}

impl ListMutationsTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ListMutationsTool {
    fn name(&self) -> &str {
        "list_mutations"
    }

    fn description(&self) -> &str {
        "List the fields on the mutation root. For reference only: this gateway never \
         executes mutations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_params()
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let fields = self.gateway.explore(explore::list_mutations).await?;
        ToolOutput::json(&fields, start.elapsed())
    }
}

pub struct GetFieldTool {
    gateway: Arc<Gateway>,
}

impl GetFieldTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GetFieldTool {
    fn name(&self) -> &str {
        "get_field"
    }

    fn description(&self) -> &str {
        "Describe one field: full description, return type, arguments with defaults, and \
         deprecation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "type": { "type": "string", "description": "Type that declares the field, e.g. Query" },
                "field": { "type": "string", "description": "Field name, e.g. team" }
            },
            "required": ["type", "field"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let type_name = require_str(&params, "type")?;
        let field = require_str(&params, "field")?;
        let detail = self
            .gateway
            .explore(|index| explore::get_field(index, type_name, field))
            .await??;
        ToolOutput::json(&detail, start.elapsed())
    }
}

pub struct GetEnumTool {
    gateway: Arc<Gateway>,
}

impl GetEnumTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GetEnumTool {
    fn name(&self) -> &str {
        "get_enum"
    }

    fn description(&self) -> &str {
        "List the values of an enum type, with deprecation reasons."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_param("Enum type name")
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let name = require_str(&params, "name")?;
        let view = self.gateway.explore(|index| explore::get_enum(index, name)).await??;
        ToolOutput::json(&view, start.elapsed())
    }
}

pub struct SearchSchemaTool {
    gateway: Arc<Gateway>,
}

impl SearchSchemaTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for SearchSchemaTool {
    fn name(&self) -> &str {
        "search_schema"
    }

    fn description(&self) -> &str {
        "Case-insensitive search over type names, type descriptions and field names."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "term": { "type": "string", "description": "Text to look for" },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of hits (default 50, max 200)"
                }
            },
            "required": ["term"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let term = require_str(&params, "term")?;
        let limit = match params.get("limit") {
            None | Some(serde_json::Value::Null) => DEFAULT_SEARCH_LIMIT,
            Some(v) => v
                .as_u64()
                .filter(|n| (1..=MAX_SEARCH_LIMIT).contains(n))
                .map(|n| n as usize)
                .ok_or_else(|| {
                    ToolError::InvalidParameters(format!(
                        "'limit' must be an integer between 1 and {MAX_SEARCH_LIMIT}"
                    ))
                })?,
        };

        let results = self
            .gateway
            .explore(|index| explore::search(index, term, limit))
            .await??;
        ToolOutput::json(&results, start.elapsed())
    }
}

pub struct GetInterfaceImplementorsTool {
    gateway: Arc<Gateway>,
}

impl GetInterfaceImplementorsTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GetInterfaceImplementorsTool {
    fn name(&self) -> &str {
        "get_interface_implementors"
    }

    fn description(&self) -> &str {
        "List the object types that implement an interface. Use with inline fragments \
         (... on Type) to select type-specific fields."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_param("Interface name, e.g. Node")
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let name = require_str(&params, "name")?;
        let types = self
            .gateway
            .explore(|index| explore::implementors(index, name))
            .await??;
        ToolOutput::json(&types, start.elapsed())
    }
}

pub struct GetUnionMembersTool {
    gateway: Arc<Gateway>,
}

impl GetUnionMembersTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GetUnionMembersTool {
    fn name(&self) -> &str {
        "get_union_members"
    }

    fn description(&self) -> &str {
        "List the member types of a union. Fields on a union can only be selected through \
         inline fragments."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_param("Union name")
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let name = require_str(&params, "name")?;
        let types = self
            .gateway
            .explore(|index| explore::union_members(index, name))
            .await??;
        ToolOutput::json(&types, start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubExecutor, test_gateway, test_gateway_with};

    async fn call(tool: &dyn Tool, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        tool.execute(params, &ToolContext::default())
            .await
            .map(|o| o.result)
    }

    #[tokio::test]
    async fn test_list_types_filter() {
        let tool = ListTypesTool::new(Arc::new(test_gateway()));
        let result = call(&tool, serde_json::json!({ "kind": "UNION" })).await.unwrap();
        let names: Vec<_> = result
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["SearchResult"]);

        let err = call(&tool, serde_json::json!({ "kind": "TABLE" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_get_type_not_found() {
        let tool = GetTypeTool::new(Arc::new(test_gateway()));
        let err = call(&tool, serde_json::json!({ "name": "Teem" })).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().contains("Team"));
    }

    #[tokio::test]
    async fn test_get_field() {
        let tool = GetFieldTool::new(Arc::new(test_gateway()));
        let result = call(&tool, serde_json::json!({ "type": "Query", "field": "team" }))
            .await
            .unwrap();
        assert_eq!(result["type"], "Team");
        assert_eq!(result["arguments"][0]["name"], "slug");
        assert_eq!(result["arguments"][0]["required"], true);
    }

    #[tokio::test]
    async fn test_list_mutations_is_reference_only() {
        let tool = ListMutationsTool::new(Arc::new(test_gateway()));
        let result = call(&tool, serde_json::json!({})).await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_limit_validation() {
        let tool = SearchSchemaTool::new(Arc::new(test_gateway()));
        let result = call(&tool, serde_json::json!({ "term": "secret", "limit": 3 }))
            .await
            .unwrap();
        assert!(result["hits"].as_array().unwrap().len() <= 3);

        let err = call(&tool, serde_json::json!({ "term": "x", "limit": 0 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_union_and_interface_tools() {
        let gateway = Arc::new(test_gateway());
        let members = call(
            &GetUnionMembersTool::new(gateway.clone()),
            serde_json::json!({ "name": "SearchResult" }),
        )
        .await
        .unwrap();
        assert_eq!(members["types"].as_array().unwrap().len(), 2);

        let implementors = call(
            &GetInterfaceImplementorsTool::new(gateway),
            serde_json::json!({ "name": "Node" }),
        )
        .await
        .unwrap();
        assert_eq!(implementors["types"][0]["name"], "Application");
    }

    #[tokio::test]
    async fn test_exploration_is_rate_limited() {
        let tool = GetEnumTool::new(Arc::new(test_gateway_with(
            Arc::new(StubExecutor::default()),
            1,
        )));
        call(&tool, serde_json::json!({ "name": "TeamRole" })).await.unwrap();
        let err = call(&tool, serde_json::json!({ "name": "TeamRole" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::RateLimited(Some(_))));
    }
}
