//! Validation outcomes and violation codes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Hint appended to every secret-policy rejection.
pub const SECRET_REMEDIATION: &str =
    "Secret values cannot be read through this gateway; use the console or CLI to view secrets instead.";

/// Why a query was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    /// Syntax error, or the query does not match the schema
    QueryInvalid,
    /// Mutation or subscription submitted
    OperationNotAllowed,
    /// Selection nesting exceeds the ceiling
    DepthExceeded,
    /// Query can reach secret material
    SecretPolicyViolation,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryInvalid => "QUERY_INVALID",
            Self::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Self::DepthExceeded => "DEPTH_EXCEEDED",
            Self::SecretPolicyViolation => "SECRET_POLICY_VIOLATION",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GraphQL operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
            Self::Subscription => write!(f, "subscription"),
        }
    }
}

/// A single reason to reject a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub code: ViolationCode,
    pub message: String,
}

impl Violation {
    pub fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ViolationCode::QueryInvalid, message)
    }

    pub fn operation_not_allowed(kind: OperationKind) -> Self {
        Self::new(
            ViolationCode::OperationNotAllowed,
            format!("only query operations are allowed, got {kind}"),
        )
    }

    pub fn depth_exceeded(actual: usize, max: usize) -> Self {
        Self::new(
            ViolationCode::DepthExceeded,
            format!("Query depth of {actual} exceeds maximum allowed depth of {max}"),
        )
    }

    pub fn secret_field(field: &str, forbidden_type: &str) -> Self {
        Self::new(
            ViolationCode::SecretPolicyViolation,
            format!(
                "Field '{field}' returns forbidden type '{forbidden_type}'. {SECRET_REMEDIATION}"
            ),
        )
    }

    pub fn secret_type_condition(forbidden_type: &str) -> Self {
        Self::new(
            ViolationCode::SecretPolicyViolation,
            format!("Inline fragment on forbidden type '{forbidden_type}'. {SECRET_REMEDIATION}"),
        )
    }

    pub fn secret_fragment_spread(fragment: &str) -> Self {
        Self::new(
            ViolationCode::SecretPolicyViolation,
            format!("Fragment '{fragment}' appears to select secret data. {SECRET_REMEDIATION}"),
        )
    }
}

impl From<Violation> for GatewayError {
    fn from(v: Violation) -> Self {
        GatewayError::QueryRejected {
            code: v.code,
            message: v.message,
        }
    }
}

/// Outcome of validating one query. Either the success fields or
/// `code`/`error` are set, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ViolationCode>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn accepted(kind: OperationKind, name: Option<String>, depth: usize) -> Self {
        Self {
            valid: true,
            operation_type: Some(kind),
            operation_name: name,
            depth: Some(depth),
            code: None,
            error_message: None,
        }
    }

    pub fn rejected(violation: Violation) -> Self {
        Self {
            valid: false,
            operation_type: None,
            operation_name: None,
            depth: None,
            code: Some(violation.code),
            error_message: Some(violation.message),
        }
    }

    /// The violation behind a rejection, if any.
    pub fn violation(&self) -> Option<Violation> {
        match (&self.code, &self.error_message) {
            (Some(code), Some(message)) => Some(Violation::new(*code, message.clone())),
            _ => None,
        }
    }

    /// `Ok(self)` when valid, otherwise the rejection as a gateway error.
    pub fn into_result(self) -> Result<Self, GatewayError> {
        match self.violation() {
            Some(v) => Err(v.into()),
            None => Ok(self),
        }
    }
}
