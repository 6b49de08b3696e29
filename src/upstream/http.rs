//! HTTP upstream: SDL over GET, queries over POST.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use crate::error::UpstreamError;
use crate::upstream::{ExecutionResponse, QueryExecutor, SchemaSource};

/// Largest response body accepted from the upstream.
const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: &'a serde_json::Value,
}

/// reqwest-backed schema source and query executor.
///
/// Either URL may be absent; the matching trait method then fails with
/// [`UpstreamError::RequestFailed`].
pub struct HttpUpstream {
    client: Client,
    schema_url: Option<Url>,
    endpoint: Option<Url>,
    auth_token: Option<SecretString>,
}

impl HttpUpstream {
    pub fn new(
        schema_url: Option<Url>,
        endpoint: Option<Url>,
        auth_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("graphql-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::RequestFailed {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            schema_url,
            endpoint,
            auth_token,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, url: &Url, request: RequestBuilder) -> Result<String, UpstreamError> {
        let mut response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| request_failed(url, e))?;

        let status = response.status();
        if response.content_length().unwrap_or(0) > MAX_RESPONSE_BYTES as u64 {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong, so cap while reading.
        let mut raw = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| request_failed(url, e))? {
            append_capped(&mut raw, &chunk, MAX_RESPONSE_BYTES)?;
        }
        let body = String::from_utf8_lossy(&raw).into_owned();

        if !status.is_success() {
            let mut body = body;
            body.truncate(body.floor_char_boundary(500));
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn append_capped(body: &mut Vec<u8>, chunk: &[u8], limit: usize) -> Result<(), UpstreamError> {
    if body.len() + chunk.len() > limit {
        tracing::warn!(max = limit, "Upstream response body exceeds limit");
        return Err(too_large());
    }
    body.extend_from_slice(chunk);
    Ok(())
}

fn too_large() -> UpstreamError {
    UpstreamError::InvalidResponse(format!(
        "response too large (max {MAX_RESPONSE_BYTES} bytes)"
    ))
}

fn request_failed(url: &Url, e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        return UpstreamError::RequestFailed {
            url: url.to_string(),
            reason: "request timed out".to_string(),
        };
    }
    UpstreamError::RequestFailed {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn missing_url(what: &str) -> UpstreamError {
    UpstreamError::RequestFailed {
        url: String::new(),
        reason: format!("no {what} URL configured"),
    }
}

#[async_trait]
impl SchemaSource for HttpUpstream {
    async fn fetch_schema(&self) -> Result<String, UpstreamError> {
        let url = self.schema_url.as_ref().ok_or_else(|| missing_url("schema"))?;
        tracing::debug!(url = %url, "Fetching SDL");
        self.send(url, self.client.get(url.clone())).await
    }
}

#[async_trait]
impl QueryExecutor for HttpUpstream {
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<ExecutionResponse, UpstreamError> {
        let url = self.endpoint.as_ref().ok_or_else(|| missing_url("endpoint"))?;
        tracing::debug!(url = %url, query_bytes = query.len(), "Executing query upstream");

        let request = self.client.post(url.clone()).json(&GraphqlRequest {
            query,
            variables: &variables,
        });
        let body = self.send(url, request).await?;

        serde_json::from_str(&body).map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }
}

impl std::fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstream")
            .field("schema_url", &self.schema_url.as_ref().map(Url::as_str))
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_urls_fail_without_network() {
        let upstream = HttpUpstream::new(None, None, None, Duration::from_secs(1)).unwrap();

        let err = upstream.fetch_schema().await.unwrap_err();
        assert!(err.to_string().contains("no schema URL configured"));

        let err = upstream
            .execute("{ ok }", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no endpoint URL configured"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let upstream = HttpUpstream::new(
            None,
            Some(Url::parse("https://api.example.com/graphql").unwrap()),
            Some(SecretString::from("hunter2")),
            Duration::from_secs(1),
        )
        .unwrap();

        let debug = format!("{upstream:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_request_body_shape() {
        let variables = serde_json::json!({ "slug": "x" });
        let body = serde_json::to_value(GraphqlRequest {
            query: "{ ok }",
            variables: &variables,
        })
        .unwrap();
        assert_eq!(body["query"], "{ ok }");
        assert_eq!(body["variables"]["slug"], "x");
    }

    #[test]
    fn test_body_cap_applies_per_chunk() {
        let mut body = Vec::new();
        append_capped(&mut body, b"0123456789", 16).unwrap();
        append_capped(&mut body, b"abcdef", 16).unwrap();
        assert_eq!(body.len(), 16);

        let err = append_capped(&mut body, b"g", 16).unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(ref m) if m.contains("too large")));
        assert_eq!(body.len(), 16);
    }
}
