//! # Response Types
//!
//! Terraform Cloud REST API response documents and their conversion into provider
//! types. Unknown attributes are kept as tagged output values.

use crate::controller::output::OutputValue;
use crate::provider::{IssuedToken, PoolState, RemoteToken};
use serde::Deserialize;
use serde_json::{Map, Value};
use zeroize::Zeroizing;

/// JSON:API top-level document
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    pub data: T,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl<T> Document<T> {
    /// Page to request after `current`, if the listing continues
    pub fn next_page(&self, current: u32) -> Option<u32> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.pagination.as_ref())
            .and_then(|pagination| pagination.next_page)
            .filter(|next| *next > current)
    }
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pagination {
    #[serde(default)]
    pub next_page: Option<u32>,
}

/// `agent-pools` resource object
#[derive(Debug, Deserialize)]
pub struct AgentPoolData {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: Option<AgentPoolRelationships>,
}

#[derive(Debug, Deserialize)]
pub struct AgentPoolRelationships {
    #[serde(default)]
    pub organization: Option<Relationship>,
}

#[derive(Debug, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<ResourceIdentifier>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
}

/// `authentication-tokens` resource object
#[derive(Debug, Deserialize)]
pub struct AuthenticationTokenData {
    pub id: String,
    pub attributes: AuthenticationTokenAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthenticationTokenAttributes {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_used_at: Option<String>,
}

impl From<AgentPoolData> for PoolState {
    fn from(data: AgentPoolData) -> Self {
        let organization = data
            .relationships
            .and_then(|r| r.organization)
            .and_then(|o| o.data)
            .map(|o| o.id)
            .unwrap_or_default();

        let mut name = String::new();
        let mut attributes = std::collections::BTreeMap::new();
        for (key, value) in data.attributes {
            if key == "name" {
                if let Value::String(s) = value {
                    name = s;
                }
                continue;
            }
            if let Some(value) = OutputValue::from_json(value) {
                attributes.insert(key, value);
            }
        }

        Self {
            id: data.id,
            name,
            organization,
            attributes,
        }
    }
}

impl From<AuthenticationTokenData> for RemoteToken {
    fn from(data: AuthenticationTokenData) -> Self {
        Self {
            id: data.id,
            name: data.attributes.description.unwrap_or_default(),
            created_at: parse_timestamp(data.attributes.created_at.as_deref()),
            last_used_at: parse_timestamp(data.attributes.last_used_at.as_deref()),
        }
    }
}

impl From<AuthenticationTokenData> for IssuedToken {
    fn from(data: AuthenticationTokenData) -> Self {
        Self {
            id: data.id,
            value: Zeroizing::new(data.attributes.token.unwrap_or_default()),
            created_at: parse_timestamp(data.attributes.created_at.as_deref()),
        }
    }
}

/// RFC 3339 timestamp to unix seconds
pub fn parse_timestamp(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
}
