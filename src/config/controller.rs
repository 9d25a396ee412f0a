//! # Reconciler Configuration
//!
//! Terraform Cloud address, resync period and retry timing.

use super::env_var_or_default;
use crate::controller::reconciler::validation::parse_kubernetes_duration;
use anyhow::{Context, Result};
use std::time::Duration;

/// Reconciler configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Terraform Cloud or Enterprise base URL
    pub tfc_address: String,
    /// Resync interval after a successful pass; `None` waits for the next change
    pub sync_period: Option<Duration>,
    /// Namespace to watch; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Exponential backoff lower bound (seconds)
    pub backoff_min_secs: u64,
    /// Exponential backoff upper bound (seconds)
    pub backoff_max_secs: u64,
    /// Delay before retrying after a status write conflict (seconds)
    pub conflict_requeue_secs: u64,
    /// HTTP timeout for Terraform Cloud calls (seconds)
    pub request_timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            tfc_address: DEFAULT_TFC_ADDRESS.to_string(),
            sync_period: Some(Duration::from_secs(300)),
            watch_namespace: None,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    ///
    /// Returns an error if `SYNC_PERIOD` is set to an invalid duration.
    pub fn from_env() -> Result<Self> {
        use crate::constants::*;
        let sync_period = std::env::var("SYNC_PERIOD")
            .unwrap_or_else(|_| DEFAULT_SYNC_PERIOD.to_string());

        Ok(Self {
            tfc_address: std::env::var("TFC_ADDRESS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TFC_ADDRESS.to_string()),
            sync_period: parse_sync_period(&sync_period)
                .with_context(|| format!("Invalid SYNC_PERIOD '{sync_period}'"))?,
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            conflict_requeue_secs: env_var_or_default(
                "CONFLICT_REQUEUE_SECS",
                DEFAULT_CONFLICT_REQUEUE_SECS,
            ),
            request_timeout_secs: env_var_or_default(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
        })
    }
}

/// Parse the resync period; empty or `0s` disables periodic resync
fn parse_sync_period(value: &str) -> Result<Option<Duration>> {
    let trimmed = value.trim();
    let is_zero = trimmed
        .strip_suffix(|c: char| c.is_ascii_alphabetic())
        .is_some_and(|number| !number.is_empty() && number.chars().all(|c| c == '0'));
    if trimmed.is_empty() || is_zero {
        return Ok(None);
    }
    Ok(Some(parse_kubernetes_duration(trimmed)?))
}
