//! # Status Management
//!
//! Builds the `Ready` condition and decides whether the status needs to be written.
//! `lastTransitionTime` only moves when the condition status flips, so repeated passes
//! with the same outcome produce an identical status and no write.

use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{AgentPoolStatus, Condition};

pub const CONDITION_READY: &str = "Ready";
pub const REASON_SUCCEEDED: &str = "ReconciliationSucceeded";

/// Set or update a condition, keeping its transition time when the status is unchanged
pub fn set_condition(
    status: &mut AgentPoolStatus,
    condition_type: &str,
    condition_status: &str,
    reason: &str,
    message: &str,
) {
    let now = chrono::Utc::now().to_rfc3339();
    match status
        .conditions
        .iter_mut()
        .find(|c| c.r#type == condition_type)
    {
        Some(existing) => {
            if existing.status != condition_status {
                existing.status = condition_status.to_string();
                existing.last_transition_time = Some(now);
            }
            existing.reason = Some(reason.to_string());
            existing.message = Some(message.to_string());
        }
        None => status.conditions.push(Condition {
            r#type: condition_type.to_string(),
            status: condition_status.to_string(),
            last_transition_time: Some(now),
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        }),
    }
}

/// Mark the resource Ready after a successful pass
pub fn set_ready(status: &mut AgentPoolStatus) {
    let message = format!(
        "Agent pool {} reconciled with {} agent token(s)",
        status.agent_pool_id,
        status.agent_tokens.len()
    );
    set_condition(status, CONDITION_READY, "True", REASON_SUCCEEDED, &message);
}

/// Record a terminal error as a human-readable condition
pub fn set_failed(status: &mut AgentPoolStatus, error: &ReconcilerError) {
    set_condition(
        status,
        CONDITION_READY,
        "False",
        error.reason(),
        &error.to_string(),
    );
}
