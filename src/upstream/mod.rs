//! Upstream collaborators.
//!
//! The gateway depends on two narrow capabilities: something that returns
//! raw SDL text, and something that runs an already-validated query. Both
//! are traits so tests can swap in the fakes from [`crate::testing`].

mod file;
mod http;

pub use file::FileSchemaSource;
pub use http::HttpUpstream;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// Returns the upstream schema as SDL text. The text is treated as opaque;
/// repair happens in the schema cache.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch_schema(&self) -> Result<String, UpstreamError>;
}

/// Runs a query the gateway has already accepted.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<ExecutionResponse, UpstreamError>;
}

/// One entry of a GraphQL `errors` array. Extra members are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamGraphqlError {
    pub message: String,
}

/// Upstream response body. The shape of `data` is not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<UpstreamGraphqlError>,
}

impl ExecutionResponse {
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
