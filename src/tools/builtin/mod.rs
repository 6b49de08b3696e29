//! Built-in gateway tools.

mod query;
mod schema;

pub use query::{ExecuteQueryTool, ValidateQueryTool};
pub use schema::{
    GetEnumTool, GetFieldTool, GetInterfaceImplementorsTool, GetTypeTool, GetUnionMembersTool,
    ListMutationsTool, ListQueriesTool, ListTypesTool, SearchSchemaTool,
};
