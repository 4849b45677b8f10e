use anyhow::{Result, anyhow};
use std::fmt::Display;
use std::str::FromStr;

/// Read `key` and parse it, using `default` when the variable is unset or
/// blank. A value that is present but unparsable is an error, not a silent
/// fallback.
pub(crate) fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}='{}': {}", key, raw, e)),
        _ => Ok(default),
    }
}

/// String variable with a default; blank counts as unset
pub(crate) fn string_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Optional string variable; blank counts as unset
pub(crate) fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
