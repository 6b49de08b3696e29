use std::str::FromStr;

use crate::error::ConfigError;

/// Read an environment variable. Unset and empty both mean "not set".
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value is not valid UTF-8".to_string(),
        }),
    }
}

/// Parse `raw` (the value of `key`) or fall back to `default`.
pub(crate) fn parse_optional<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{value}': {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional() {
        assert_eq!(parse_optional::<u64>("K", None, 30).unwrap(), 30);
        assert_eq!(parse_optional::<u64>("K", Some(" 5 ".into()), 30).unwrap(), 5);

        let err = parse_optional::<u64>("K", Some("soon".into()), 30).unwrap_err();
        assert!(err.to_string().contains("K"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_unset_env_is_none() {
        assert_eq!(
            optional_env("GRAPHQL_GATEWAY_TEST_SURELY_UNSET").unwrap(),
            None
        );
    }
}
