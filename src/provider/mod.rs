//! # Providers
//!
//! Interfaces to everything outside the reconciliation engine.
//!
//! - `AgentPoolApi` - Terraform Cloud agent pools and agent tokens
//! - `ApiClientFactory` - builds an `AgentPoolApi` from the resource's API token
//! - `ResourceStore` - finalizer and status writes with optimistic concurrency
//! - `SecretStore` - write-once storage for agent token values
//! - `OutputStore` - key-value storage for coerced agent pool outputs
//!
//! Implementations:
//! - `tfc` - Terraform Cloud REST client (reqwest with rustls)
//! - `kubernetes` - kube-backed stores and client factory

pub mod kubernetes;
pub mod tfc;

use crate::controller::output::OutputValue;
use crate::crd::AgentPool;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors returned by the Terraform Cloud API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Remote object does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Network failure, timeout, rate limit or server-side error
    #[error("transient API error: {0}")]
    Transient(String),
    /// Request refused by the API (authorization, validation)
    #[error("API request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error detail returned by the API
        message: String,
    },
}

/// Agent pool as observed in Terraform Cloud
#[derive(Debug, Clone, PartialEq)]
pub struct PoolState {
    /// Agent pool ID
    pub id: String,
    /// Agent pool name
    pub name: String,
    /// Organization owning the pool
    pub organization: String,
    /// Remaining attributes, `null` values already dropped
    pub attributes: BTreeMap<String, OutputValue>,
}

/// Agent token as listed by Terraform Cloud (no secret value)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteToken {
    /// Agent token ID
    pub id: String,
    /// Token description, used as the token name
    pub name: String,
    /// Unix timestamp of creation
    pub created_at: Option<i64>,
    /// Unix timestamp of last use
    pub last_used_at: Option<i64>,
}

/// Newly issued agent token
///
/// The value is only returned once by Terraform Cloud.
#[derive(Debug)]
pub struct IssuedToken {
    /// Agent token ID
    pub id: String,
    /// Secret token value
    pub value: Zeroizing<String>,
    /// Unix timestamp of creation
    pub created_at: Option<i64>,
}

/// Terraform Cloud agent pool operations
#[async_trait]
pub trait AgentPoolApi: Send + Sync {
    /// Read an agent pool by ID
    async fn get_pool(&self, pool_id: &str) -> Result<PoolState, ApiError>;

    /// Find an agent pool by name within an organization
    async fn find_pool(&self, organization: &str, name: &str)
        -> Result<Option<PoolState>, ApiError>;

    /// Create an agent pool and return its state
    async fn create_pool(&self, organization: &str, name: &str) -> Result<PoolState, ApiError>;

    /// Rename an agent pool
    async fn update_pool(&self, pool_id: &str, name: &str) -> Result<PoolState, ApiError>;

    /// Delete an agent pool
    async fn delete_pool(&self, pool_id: &str) -> Result<(), ApiError>;

    /// List the agent tokens of a pool
    async fn list_tokens(&self, pool_id: &str) -> Result<Vec<RemoteToken>, ApiError>;

    /// Issue a new agent token
    async fn create_token(&self, pool_id: &str, name: &str) -> Result<IssuedToken, ApiError>;

    /// Revoke an agent token
    async fn revoke_token(&self, token_id: &str) -> Result<(), ApiError>;
}

/// Errors raised while building an API client
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Referenced Secret or key is missing or empty
    #[error("API token unavailable: {0}")]
    Unavailable(String),
    /// Secret could not be read for another reason
    #[error("failed to read API token: {0}")]
    Lookup(String),
    /// HTTP client could not be built
    #[error("failed to build API client: {0}")]
    Client(String),
}

/// Builds an `AgentPoolApi` for a resource using its API token reference
#[async_trait]
pub trait ApiClientFactory: Send + Sync {
    /// Resolve the API token of `pool` and return a ready client
    async fn client_for(&self, pool: &AgentPool) -> Result<Arc<dyn AgentPoolApi>, CredentialsError>;
}

/// Errors returned by the object store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write raced with another writer; re-read and retry the whole pass
    #[error("conflict writing {0}")]
    Conflict(String),
    /// The object no longer exists
    #[error("{0} not found")]
    NotFound(String),
    /// Any other failure
    #[error("store error: {0}")]
    Other(String),
}

/// Finalizer and status accessor for `AgentPool` objects
///
/// Every write carries the object's `resourceVersion`; a stale version yields
/// `StoreError::Conflict`.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Add the finalizer and return the updated object
    async fn add_finalizer(&self, pool: &AgentPool, finalizer: &str)
        -> Result<AgentPool, StoreError>;

    /// Remove the finalizer
    async fn remove_finalizer(&self, pool: &AgentPool, finalizer: &str) -> Result<(), StoreError>;

    /// Write `pool.status` and return the updated object
    async fn update_status(&self, pool: &AgentPool) -> Result<AgentPool, StoreError>;
}

/// Storage for agent token values
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store the value of a newly issued token
    async fn persist_secret(
        &self,
        owner: &AgentPool,
        name: &str,
        value: &Zeroizing<String>,
    ) -> Result<(), StoreError>;

    /// Drop the value of a revoked token; a missing value is not an error
    async fn remove_secret(&self, owner: &AgentPool, name: &str) -> Result<(), StoreError>;
}

/// Key-value storage for agent pool outputs
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Replace the published outputs of `owner`
    async fn publish(
        &self,
        owner: &AgentPool,
        outputs: &BTreeMap<String, String>,
    ) -> Result<(), StoreError>;
}
