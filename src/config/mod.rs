//! Gateway configuration, resolved from the environment.
//!
//! `.env` is loaded by the binary before [`GatewayConfig::from_env`] runs.
//! CLI flags may override individual values afterwards.

mod helpers;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;
use crate::schema::DEFAULT_FETCH_TIMEOUT;

pub(crate) use helpers::optional_env;
use helpers::parse_optional;

pub const DEFAULT_RATE_LIMIT_RPM: i64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the upstream SDL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocation {
    File(PathBuf),
    Url(Url),
}

/// Resolved gateway settings.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Requests per minute across all tools; `<= 0` disables limiting.
    pub rate_limit_rpm: i64,
    pub schema: SchemaLocation,
    /// GraphQL endpoint for `execute_query`. Without it, execution is
    /// unavailable but validation and exploration still work.
    pub endpoint: Option<Url>,
    /// Bearer token sent to the schema URL and the endpoint.
    pub auth_token: Option<SecretString>,
    pub schema_fetch_timeout: Duration,
    pub request_timeout: Duration,
    /// Added to the default forbidden types.
    pub extra_forbidden_types: Vec<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("schema", &self.schema)
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("auth_token", &self.auth_token.is_some())
            .field("schema_fetch_timeout", &self.schema_fetch_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("extra_forbidden_types", &self.extra_forbidden_types)
            .finish()
    }
}

impl GatewayConfig {
    /// Resolve from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(optional_env)
    }

    /// Resolve using `lookup` in place of the process environment.
    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        let schema = match (
            lookup("GATEWAY_SCHEMA_FILE")?,
            lookup("GATEWAY_SCHEMA_URL")?,
        ) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    key: "GATEWAY_SCHEMA_FILE".to_string(),
                    message: "set either GATEWAY_SCHEMA_FILE or GATEWAY_SCHEMA_URL, not both"
                        .to_string(),
                });
            }
            (Some(path), None) => SchemaLocation::File(PathBuf::from(path)),
            (None, Some(url)) => SchemaLocation::Url(parse_url("GATEWAY_SCHEMA_URL", &url)?),
            (None, None) => {
                return Err(ConfigError::MissingRequired {
                    key: "GATEWAY_SCHEMA_FILE".to_string(),
                    hint: "Set GATEWAY_SCHEMA_FILE to an SDL file or GATEWAY_SCHEMA_URL to a URL \
                           serving SDL."
                        .to_string(),
                });
            }
        };

        let endpoint = lookup("GATEWAY_ENDPOINT")?
            .map(|u| parse_url("GATEWAY_ENDPOINT", &u))
            .transpose()?;

        let extra_forbidden_types = lookup("GATEWAY_EXTRA_FORBIDDEN_TYPES")?
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            rate_limit_rpm: parse_optional(
                "GATEWAY_RATE_LIMIT_RPM",
                lookup("GATEWAY_RATE_LIMIT_RPM")?,
                DEFAULT_RATE_LIMIT_RPM,
            )?,
            schema,
            endpoint,
            auth_token: lookup("GATEWAY_AUTH_TOKEN")?.map(SecretString::from),
            schema_fetch_timeout: Duration::from_secs(parse_optional(
                "GATEWAY_SCHEMA_FETCH_TIMEOUT_SECS",
                lookup("GATEWAY_SCHEMA_FETCH_TIMEOUT_SECS")?,
                DEFAULT_FETCH_TIMEOUT.as_secs(),
            )?),
            request_timeout: Duration::from_secs(parse_optional(
                "GATEWAY_REQUEST_TIMEOUT_SECS",
                lookup("GATEWAY_REQUEST_TIMEOUT_SECS")?,
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )?),
            extra_forbidden_types,
        })
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}' is not a valid URL: {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}
