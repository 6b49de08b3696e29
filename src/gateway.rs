//! Gateway facade.
//!
//! Each call is admitted by the [`RateLimiter`], then resolves the cached
//! schema and the shared [`SchemaIndex`] before doing its own work:
//!
//! ```text
//! admit -> SchemaCache::get_schema -> SchemaIndex (built once) -> validate -> execute
//! ```
//!
//! Validation failures come back as [`ValidationResult`] values (or
//! [`GatewayError::QueryRejected`] from [`Gateway::execute_query`]); only
//! schema fetch and parse failures are faults.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::config::{GatewayConfig, SchemaLocation};
use crate::error::{GatewayError, UpstreamError};
use crate::safety::ForbiddenTypeSet;
use crate::schema::{SchemaCache, SchemaIndex};
use crate::tools::rate_limiter::RateLimiter;
use crate::upstream::{
    ExecutionResponse, FileSchemaSource, HttpUpstream, QueryExecutor, SchemaSource,
};
use crate::validation::{QueryValidator, ValidationResult};

/// Shared entry point for every tool call. Wrap in `Arc` and clone freely.
pub struct Gateway {
    limiter: RateLimiter,
    schema: SchemaCache,
    index: OnceCell<Arc<SchemaIndex>>,
    validator: QueryValidator,
    executor: Option<Arc<dyn QueryExecutor>>,
    /// How long one call waits for the schema fetch. `None` waits for the
    /// fetch's own timeout.
    schema_deadline: Option<Duration>,
}

impl Gateway {
    pub fn new(schema: SchemaCache, limiter: RateLimiter) -> Self {
        Self {
            limiter,
            schema,
            index: OnceCell::new(),
            validator: QueryValidator::default(),
            executor: None,
            schema_deadline: None,
        }
    }

    pub fn with_validator(mut self, validator: QueryValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_schema_deadline(mut self, deadline: Duration) -> Self {
        self.schema_deadline = Some(deadline);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Wire a gateway from resolved configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, UpstreamError> {
        let schema_url = match &config.schema {
            SchemaLocation::Url(url) => Some(url.clone()),
            SchemaLocation::File(_) => None,
        };
        let needs_http = schema_url.is_some() || config.endpoint.is_some();

        let http = if needs_http {
            Some(Arc::new(HttpUpstream::new(
                schema_url,
                config.endpoint.clone(),
                config.auth_token.clone(),
                config.request_timeout,
            )?))
        } else {
            None
        };

        let source: Arc<dyn SchemaSource> = match (&config.schema, &http) {
            (SchemaLocation::File(path), _) => Arc::new(FileSchemaSource::new(path.clone())),
            (SchemaLocation::Url(_), Some(http)) => http.clone(),
            (SchemaLocation::Url(url), None) => {
                return Err(UpstreamError::RequestFailed {
                    url: url.to_string(),
                    reason: "HTTP upstream not configured".to_string(),
                });
            }
        };

        let forbidden = ForbiddenTypeSet::with_additional(config.extra_forbidden_types.clone());
        let mut gateway = Self::new(
            SchemaCache::with_timeout(source, config.schema_fetch_timeout),
            RateLimiter::new(config.rate_limit_rpm),
        )
        .with_validator(QueryValidator::new(Arc::new(forbidden)))
        .with_schema_deadline(config.request_timeout);

        if config.endpoint.is_some()
            && let Some(http) = http
        {
            gateway = gateway.with_executor(http);
        }

        tracing::info!(
            rate_limit_rpm = config.rate_limit_rpm,
            executor = gateway.executor.is_some(),
            "Gateway configured"
        );
        Ok(gateway)
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schema
    }

    pub fn validator(&self) -> &QueryValidator {
        &self.validator
    }

    pub fn has_executor(&self) -> bool {
        self.executor.is_some()
    }

    /// Consume one rate-limit token or fail with `RateLimited`.
    pub fn admit(&self) -> Result<(), GatewayError> {
        self.limiter.check().map_err(|e| {
            tracing::warn!(retry_after = ?e.retry_after, "Call rate limited");
            GatewayError::RateLimited {
                retry_after: e.retry_after,
            }
        })
    }

    /// The shared index, built from the cached schema on first use.
    ///
    /// A parse failure is not stored; the next call re-parses the same
    /// cached text and fails the same way.
    pub async fn index(&self) -> Result<Arc<SchemaIndex>, GatewayError> {
        let text = match self.schema_deadline {
            Some(deadline) => self.schema.get_schema_with_deadline(deadline).await?,
            None => self.schema.get_schema().await?,
        };
        self.index
            .get_or_try_init(|| async {
                let index = SchemaIndex::parse(&text).map_err(|e| {
                    tracing::warn!(error = %e, "Cached schema does not parse");
                    GatewayError::SchemaParseFailed(e.to_string())
                })?;
                tracing::info!(types = index.len(), "Schema index built");
                Ok(Arc::new(index))
            })
            .await
            .cloned()
    }

    /// Validate a query without executing it.
    pub async fn validate_query(&self, query: &str) -> Result<ValidationResult, GatewayError> {
        self.admit()?;
        let index = self.index().await?;
        Ok(self.validate_with(&index, query))
    }

    /// Validate, then hand the query to the executor.
    ///
    /// Uses one rate-limit token for the whole call.
    pub async fn execute_query(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<ExecutionResponse, GatewayError> {
        self.admit()?;
        let index = self.index().await?;
        let accepted = self.validate_with(&index, query).into_result()?;

        let executor = self
            .executor
            .as_ref()
            .ok_or(GatewayError::ExecutorUnavailable)?;

        let started = std::time::Instant::now();
        let response = executor.execute(query, variables).await.map_err(|e| {
            tracing::warn!(error = %e, "Upstream execution failed");
            GatewayError::from(e)
        })?;

        tracing::info!(
            operation = accepted.operation_name.as_deref().unwrap_or("<anonymous>"),
            upstream_errors = response.errors.len(),
            elapsed = ?started.elapsed(),
            "Query executed"
        );
        Ok(response)
    }

    /// Run a read-only view over the index, after admission.
    pub async fn explore<T>(
        &self,
        view: impl FnOnce(&SchemaIndex) -> T,
    ) -> Result<T, GatewayError> {
        self.admit()?;
        let index = self.index().await?;
        Ok(view(&index))
    }

    /// Time until the limiter would admit another call.
    pub fn retry_after(&self) -> Duration {
        self.limiter.wait_time()
    }

    fn validate_with(&self, index: &SchemaIndex, query: &str) -> ValidationResult {
        let result = self.validator.validate(index, query);
        match (&result.code, &result.error_message) {
            (Some(code), Some(message)) => {
                tracing::warn!(code = %code, error = %message, "Query rejected");
            }
            _ => {
                tracing::info!(
                    operation_type = ?result.operation_type,
                    operation_name = result.operation_name.as_deref().unwrap_or("<anonymous>"),
                    depth = result.depth,
                    "Query accepted"
                );
            }
        }
        result
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("schema", &self.schema)
            .field("index_built", &self.index.initialized())
            .field("unlimited", &self.limiter.is_unlimited())
            .field("executor", &self.executor.is_some())
            .field("schema_deadline", &self.schema_deadline)
            .finish()
    }
}
