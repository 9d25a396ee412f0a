//! # Custom Resource Definitions
//!
//! CRD types for the Agent Pool Controller.
//!
//! This module contains the `AgentPool` custom resource: the desired state declared by
//! platform operators and the observed state written back by the reconciler.

mod status;

pub use status::{AgentPoolStatus, AgentToken, Condition};

use serde::{Deserialize, Serialize};

/// AgentPool Custom Resource Definition
///
/// Declares a Terraform Cloud agent pool and the agent tokens that should exist for it.
///
/// # Example
///
/// ```yaml
/// apiVersion: app.terraform.io/v1alpha2
/// kind: AgentPool
/// metadata:
///   name: build-agents
///   namespace: default
/// spec:
///   name: build-agents
///   organization: acme
///   token:
///     secretKeyRef:
///       name: tfc-operator
///       key: token
///   agentTokens:
///     - name: runner-a
///     - name: runner-b
/// ```
#[derive(kube::CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "AgentPool",
    group = "app.terraform.io",
    version = "v1alpha2",
    namespaced,
    status = "AgentPoolStatus",
    shortname = "ap",
    printcolumn = r#"{"name":"Agent Pool ID", "type":"string", "jsonPath":".status.agentPoolID"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolSpec {
    /// Agent pool name in Terraform Cloud
    pub name: String,
    /// API token used for Terraform Cloud calls
    pub token: Token,
    /// Organization that owns the agent pool
    /// Cannot be changed once the pool has been created
    pub organization: String,
    /// Agent tokens to generate for the pool
    /// When present, the list must contain at least one entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1))]
    pub agent_tokens: Option<Vec<AgentToken>>,
}

impl AgentPoolSpec {
    /// Desired agent token names in declaration order
    pub fn agent_token_names(&self) -> Vec<&str> {
        self.agent_tokens
            .iter()
            .flatten()
            .map(|t| t.name.as_str())
            .collect()
    }
}

/// Reference to the Terraform Cloud API token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Selects a key of a Secret in the resource namespace
    pub secret_key_ref: SecretKeyRef,
}

/// Secret key selector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    /// Secret name
    pub name: String,
    /// Key within the Secret data
    pub key: String,
}
