//! # Controller Configuration
//!
//! Controller-level configuration loaded from environment variables.
//!
//! All configuration has sensible defaults and can be overridden via environment variables.
//! Environment variables are populated from a ConfigMap using `envFrom` in the deployment.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

use anyhow::Result;

/// Load configuration from environment variables with defaults
///
/// # Errors
///
/// Returns an error if `SYNC_PERIOD` is not a valid duration.
pub fn load_config() -> Result<(ControllerConfig, ServerConfig)> {
    Ok((ControllerConfig::from_env()?, ServerConfig::from_env()))
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
