//! Error types for the gateway.

use std::time::Duration;

use thiserror::Error;

use crate::validation::ViolationCode;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the upstream collaborators (schema source, query executor).
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the gateway facade.
///
/// Only `SchemaFetchFailed` and `SchemaParseFailed` are faults. Everything
/// else is a per-call outcome the caller can act on.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Schema fetch failed: {0}")]
    SchemaFetchFailed(String),

    #[error("Schema parse failed: {0}")]
    SchemaParseFailed(String),

    /// The caller stopped waiting for the schema fetch; the fetch itself
    /// carries on.
    #[error("Schema not available within {0:?}")]
    SchemaWaitTimedOut(Duration),

    #[error("Query rejected ({code}): {message}")]
    QueryRejected { code: ViolationCode, message: String },

    #[error("No query executor is configured (set GATEWAY_ENDPOINT)")]
    ExecutorUnavailable,

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl GatewayError {
    /// Whether the error aborts the calling operation as a system fault.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::SchemaFetchFailed(_) | Self::SchemaParseFailed(_)
        )
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(e: UpstreamError) -> Self {
        Self::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert!(GatewayError::SchemaFetchFailed("x".into()).is_fault());
        assert!(GatewayError::SchemaParseFailed("x".into()).is_fault());
        assert!(
            !GatewayError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .is_fault()
        );
        assert!(
            !GatewayError::QueryRejected {
                code: ViolationCode::DepthExceeded,
                message: "too deep".into(),
            }
            .is_fault()
        );
    }

    #[test]
    fn test_rejection_message_names_code() {
        let err = GatewayError::QueryRejected {
            code: ViolationCode::OperationNotAllowed,
            message: "only query operations are allowed".into(),
        };
        assert!(err.to_string().contains("OPERATION_NOT_ALLOWED"));
    }
}
