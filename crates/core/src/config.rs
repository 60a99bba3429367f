//! Helpers for reading typed configuration from environment variables.
//!
//! Every binary calls `dotenvy::dotenv()` first, so values may come from the
//! process environment or a local `.env` file. Missing variables fall back
//! to the supplied default; present but unparseable values are reported as
//! [`CoreError::Config`] instead of being silently replaced.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::CoreError;

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset.
pub fn env_or<T>(key: &'static str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_or(key, std::env::var(key).ok(), default)
}

/// Read a comma-separated list from `key`, trimming entries and dropping
/// empty ones. Falls back to `default` when the variable is unset.
pub fn env_list(key: &'static str, default: &str) -> Vec<String> {
    split_list(&std::env::var(key).unwrap_or_else(|_| default.to_string()))
}

/// Parse an optional raw value, using `default` when it is absent or blank.
pub fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|e: T::Err| CoreError::Config {
                key,
                message: format!("'{value}': {e}"),
            })
        }
        _ => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
