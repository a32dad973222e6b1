//! Environment-driven configuration helpers.
//!
//! Each component owns its config struct with a `Default` and a
//! `from_env()` constructor; these helpers keep the parsing consistent.
//! Unset variables fall back to defaults, but a variable that is set to
//! something unparseable is an error rather than silently ignored.

use crate::ConfigError;
use std::str::FromStr;

/// Read `name` and parse it, returning `default` when unset or empty.
pub fn env_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(name)? {
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// Read `name` and parse it, returning `None` when unset or empty.
pub fn env_opt<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, &raw).map(Some),
        _ => Ok(None),
    }
}

/// Parse one raw value on behalf of `field`.
pub fn parse_value<T>(field: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_ok() {
        assert_eq!(parse_value::<i32>("RECAP_YEAR", " 2025 "), Ok(2025));
    }

    #[test]
    fn test_parse_value_invalid() {
        let err = parse_value::<u64>("RECAP_CACHE_MAX_ENTRIES", "lots").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "RECAP_CACHE_MAX_ENTRIES"));
    }

    #[test]
    fn test_env_or_unset_uses_default() {
        let value = env_or("RECAP_TEST_SURELY_UNSET_VARIABLE", 500usize).unwrap();
        assert_eq!(value, 500);
    }
}
