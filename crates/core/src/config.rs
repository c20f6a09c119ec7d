//! Helpers for environment-driven configuration.
//!
//! Every `from_env` constructor in the workspace reads its variables through
//! [`env_or`] and [`env_opt`] so that a malformed value surfaces as a
//! [`ConfigError`] naming the offending variable.

use std::str::FromStr;

/// A configuration variable was present but could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Read `name` from the environment, falling back to `default` when unset.
pub fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(env_opt(name)?.unwrap_or(default))
}

/// Read `name` from the environment; `None` when unset or empty.
pub fn env_opt<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    parse_opt(name, std::env::var(name).ok())
}

/// Parse a raw (possibly absent) value for the variable `name`.
pub fn parse_opt<T: FromStr>(name: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                expected: std::any::type_name::<T>(),
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_blank_values_are_none() {
        assert_eq!(parse_opt::<u64>("X", None).unwrap(), None);
        assert_eq!(parse_opt::<u64>("X", Some("  ".into())).unwrap(), None);
    }

    #[test]
    fn parses_trimmed_values() {
        assert_eq!(parse_opt::<u64>("X", Some(" 42 ".into())).unwrap(), Some(42));
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let err = parse_opt::<u16>("QUEUE_CONCURRENCY", Some("lots".into())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("QUEUE_CONCURRENCY"));
        assert!(msg.contains("\"lots\""));
    }

    #[test]
    fn env_or_uses_default_when_unset() {
        std::env::remove_var("EMBER_CORE_TEST_UNSET_VAR");
        assert_eq!(env_or("EMBER_CORE_TEST_UNSET_VAR", 7u32).unwrap(), 7);
    }
}
