//! # Request Types
//!
//! Terraform Cloud REST API request bodies (JSON:API documents).
//!
//! API Reference: https://developer.hashicorp.com/terraform/cloud-docs/api-docs/agents

use serde::Serialize;

/// Body for `POST /organizations/{org}/agent-pools` and `PATCH /agent-pools/{id}`
#[derive(Debug, Serialize)]
pub struct AgentPoolRequest {
    pub data: AgentPoolRequestData,
}

#[derive(Debug, Serialize)]
pub struct AgentPoolRequestData {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: AgentPoolAttributes,
}

#[derive(Debug, Serialize)]
pub struct AgentPoolAttributes {
    pub name: String,
}

impl AgentPoolRequest {
    /// Create or rename request carrying the pool name
    pub fn new(name: &str) -> Self {
        Self {
            data: AgentPoolRequestData {
                kind: "agent-pools",
                attributes: AgentPoolAttributes {
                    name: name.to_string(),
                },
            },
        }
    }
}

/// Body for `POST /agent-pools/{id}/authentication-tokens`
///
/// The token name is sent as its description.
#[derive(Debug, Serialize)]
pub struct AuthenticationTokenRequest {
    pub data: AuthenticationTokenRequestData,
}

#[derive(Debug, Serialize)]
pub struct AuthenticationTokenRequestData {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: AuthenticationTokenRequestAttributes,
}

#[derive(Debug, Serialize)]
pub struct AuthenticationTokenRequestAttributes {
    pub description: String,
}

impl AuthenticationTokenRequest {
    pub fn new(name: &str) -> Self {
        Self {
            data: AuthenticationTokenRequestData {
                kind: "authentication-tokens",
                attributes: AuthenticationTokenRequestAttributes {
                    description: name.to_string(),
                },
            },
        }
    }
}
