//! JSON-lines tool server on stdin/stdout.
//!
//! Each input line is one request:
//!
//! ```text
//! {"id": 1, "tool": "validate_query", "params": {"query": "{ __typename }"}}
//! ```
//!
//! and produces exactly one output line, `{"id": 1, "result": ...}` or
//! `{"id": 1, "error": {"code": ..., "message": ...}}`. Requests run
//! concurrently, so responses may arrive out of order; match them by `id`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::tools::{ToolContext, ToolError, ToolRegistry};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: serde_json::Value,
    tool: String,
    #[serde(default = "empty_params")]
    params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::json!({})
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn ok(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: serde_json::Value, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

impl From<(serde_json::Value, ToolError)> for Response {
    fn from((id, e): (serde_json::Value, ToolError)) -> Self {
        Self::err(id, e.code(), e.to_string())
    }
}

/// Handle one request line.
pub async fn handle_line(registry: &ToolRegistry, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return Response::err(
                serde_json::Value::Null,
                "INVALID_REQUEST",
                format!("Malformed request: {e}"),
            );
        }
    };

    let ctx = ToolContext::new(Some("serve".to_string()));
    match registry.dispatch(&request.tool, request.params, &ctx).await {
        Ok(output) => Response::ok(request.id, output.result),
        Err(e) => (request.id, e).into(),
    }
}

/// Serve requests from `input` until EOF, writing responses to `output`.
pub async fn serve<R, W>(registry: Arc<ToolRegistry>, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut tasks = JoinSet::new();
    let mut lines = input.lines();
    let mut received = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        received += 1;
        let registry = Arc::clone(&registry);
        let tx = tx.clone();
        tasks.spawn(async move {
            let response = handle_line(&registry, &line).await;
            match serde_json::to_string(&response) {
                Ok(encoded) => {
                    let _ = tx.send(encoded).await;
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode response"),
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Request task panicked");
        }
    }
    drop(tx);
    writer.await??;

    tracing::info!(requests = received, "Input closed, server stopped");
    Ok(())
}
