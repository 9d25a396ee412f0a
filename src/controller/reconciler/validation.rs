//! # Validation
//!
//! Validates AgentPool specs and duration strings.

use crate::crd::AgentPoolSpec;
use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;

/// Parse Kubernetes duration string into std::time::Duration
/// Supports formats: "30s", "1m", "5m", "1h", "2h", "1d"
/// Returns Duration or error if format is invalid
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    let duration_regex = Regex::new(r"^(?P<number>\d+)(?P<unit>[smhd])$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let interval_lower = duration_trimmed.to_lowercase();

    let captures = duration_regex
        .captures(&interval_lower)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '1m', '5m', '1h')",
                duration_trimmed
            )
        })?;

    let number: u64 = captures["number"].parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid duration number '{}' in '{}': {}",
            &captures["number"],
            duration_trimmed,
            e
        )
    })?;

    if number == 0 {
        return Err(anyhow::anyhow!(
            "Duration number must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    let multiplier = match &captures["unit"] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        unit => {
            return Err(anyhow::anyhow!(
                "Invalid unit '{}' in duration '{}'. Expected: s, m, h, or d",
                unit,
                duration_trimmed
            ));
        }
    };

    number
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow::anyhow!("Duration '{duration_trimmed}' is too large"))
}

/// Validate an AgentPool spec before any remote call is made
/// Returns Ok(()) if valid, Err with descriptive message if invalid
pub fn validate_agent_pool_spec(spec: &AgentPoolSpec) -> Result<()> {
    if spec.name.trim().is_empty() {
        return Err(anyhow::anyhow!("name is required but is empty"));
    }

    validate_organization_name(&spec.organization)?;

    if spec.token.secret_key_ref.name.is_empty() || spec.token.secret_key_ref.key.is_empty() {
        return Err(anyhow::anyhow!(
            "token.secretKeyRef requires both name and key"
        ));
    }

    if let Some(tokens) = &spec.agent_tokens {
        if tokens.is_empty() {
            return Err(anyhow::anyhow!(
                "agentTokens must contain at least one entry when specified"
            ));
        }
        // Token names become keys of the agent token Secret
        let secret_key_regex = Regex::new(r"^[-._a-zA-Z0-9]+$")
            .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;
        let mut seen = HashSet::new();
        for token in tokens {
            if token.name.trim().is_empty() {
                return Err(anyhow::anyhow!("agentTokens entries require a name"));
            }
            if !secret_key_regex.is_match(&token.name) {
                return Err(anyhow::anyhow!(
                    "Invalid agent token name '{}': only letters, numbers, '-', '_' and '.' are allowed",
                    token.name
                ));
            }
            if !seen.insert(token.name.as_str()) {
                return Err(anyhow::anyhow!(
                    "agentTokens contains duplicate name '{}'",
                    token.name
                ));
            }
        }
    }

    Ok(())
}

/// Terraform Cloud organization names: letters, numbers, `-` and `_`
fn validate_organization_name(organization: &str) -> Result<()> {
    if organization.is_empty() {
        return Err(anyhow::anyhow!("organization is required but is empty"));
    }

    let organization_regex = Regex::new(r"^[A-Za-z0-9_-]+$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    if !organization_regex.is_match(organization) {
        return Err(anyhow::anyhow!(
            "Invalid organization '{}': only letters, numbers, '-' and '_' are allowed",
            organization
        ));
    }

    Ok(())
}
