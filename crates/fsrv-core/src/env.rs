//! Environment variable utilities
//!
//! Typed lookups with defaults, used by [`crate::config::ServerConfig::from_env`].
//!
//! ```ignore
//! use fsrv_core::env::{env_get, env_get_opt};
//!
//! let workers: usize = env_get("FSRV_WORKERS", 4);
//! let dir: Option<String> = env_get_opt("FSRV_STORAGE_DIR");
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Unset variables and values that fail to parse both yield `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

// ============================================================================
// Tests
// ============================================================================
