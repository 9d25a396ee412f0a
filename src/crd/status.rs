//! # AgentPool Status
//!
//! Observed state written by the reconciler: the remote pool ID, the materialized agent
//! tokens and the `Ready` condition.

use serde::{Deserialize, Serialize};

/// Agent token tracked for an agent pool
///
/// In the spec only `name` is meaningful. In the status every field is filled from the
/// Terraform Cloud response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentToken {
    /// Agent token name
    pub name: String,
    /// Agent token ID
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Unix timestamp of when the agent token was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Unix timestamp of when the agent token was last used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<i64>,
}

impl AgentToken {
    /// Token reference carrying only a name, as written in the spec
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Status of the AgentPool resource
///
/// Lists are always serialized so that a merge patch can shrink them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolStatus {
    /// Generation of the spec last reconciled successfully
    #[serde(default)]
    pub observed_generation: i64,
    /// Terraform Cloud agent pool ID managed by the controller
    #[serde(default, rename = "agentPoolID")]
    pub agent_pool_id: String,
    /// Agent tokens generated by the controller
    #[serde(default)]
    pub agent_tokens: Vec<AgentToken>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl AgentPoolStatus {
    /// Find a tracked agent token by name
    pub fn token(&self, name: &str) -> Option<&AgentToken> {
        self.agent_tokens.iter().find(|t| t.name == name)
    }

    /// Find a condition by type
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}
