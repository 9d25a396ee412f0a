//! # Reconciler Types
//!
//! Shared context handed to every reconciliation and the error taxonomy used to pick a
//! requeue strategy.

use crate::config::ControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use crate::provider::kubernetes::{
    KubeApiClientFactory, KubeOutputStore, KubeResourceStore, KubeSecretStore,
};
use crate::provider::{
    ApiClientFactory, ApiError, CredentialsError, OutputStore, ResourceStore, SecretStore,
    StoreError,
};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Per-resource retry state
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: ExponentialBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

/// Reconciler context
///
/// Collaborators are trait objects so that the reconciliation logic can run against
/// in-memory fakes.
pub struct Reconciler {
    pub api_factory: Arc<dyn ApiClientFactory>,
    pub resources: Arc<dyn ResourceStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub outputs: Arc<dyn OutputStore>,
    pub config: ControllerConfig,
    /// Backoff state keyed by `namespace/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Build a reconciler backed by the Kubernetes API and Terraform Cloud
    pub fn new(client: Client, config: ControllerConfig) -> Self {
        Self::with_providers(
            Arc::new(KubeApiClientFactory::new(client.clone(), &config)),
            Arc::new(KubeResourceStore::new(client.clone())),
            Arc::new(KubeSecretStore::new(client.clone())),
            Arc::new(KubeOutputStore::new(client)),
            config,
        )
    }

    pub fn with_providers(
        api_factory: Arc<dyn ApiClientFactory>,
        resources: Arc<dyn ResourceStore>,
        secrets: Arc<dyn SecretStore>,
        outputs: Arc<dyn OutputStore>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            api_factory,
            resources,
            secrets,
            outputs,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Advance the backoff of `key` and return the delay with the consecutive error count
    pub fn next_backoff(&self, key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_insert_with(|| {
                    BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                });
                state.increment_error();
                let seconds = state.backoff.next_backoff_seconds();
                (Duration::from_secs(seconds), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using maximum backoff", e);
                (Duration::from_secs(self.config.backoff_max_secs), 0)
            }
        }
    }

    /// Forget the error history of `key` after a successful pass
    pub fn reset_backoff(&self, key: &str) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(key);
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }

    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_secs(self.config.conflict_requeue_secs)
    }
}

/// Reconciliation errors
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Terraform Cloud API error: {0}")]
    Api(#[from] ApiError),
    #[error("status write conflict: {0}")]
    Conflict(String),
    #[error("object store error: {0}")]
    Store(StoreError),
    #[error("failed to store value of agent token '{name}': {source}")]
    SecretStore {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("{0}")]
    Credentials(#[from] CredentialsError),
    #[error("{0}")]
    TerminalDrift(String),
    #[error("invalid AgentPool spec: {0}")]
    InvalidSpec(String),
}

impl From<StoreError> for ReconcilerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(message) => ReconcilerError::Conflict(message),
            other => ReconcilerError::Store(other),
        }
    }
}

impl ReconcilerError {
    /// Failures expected to clear up on their own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReconcilerError::Api(ApiError::Transient(_) | ApiError::NotFound(_))
                | ReconcilerError::Store(_)
                | ReconcilerError::SecretStore { .. }
                | ReconcilerError::Credentials(CredentialsError::Lookup(_))
        )
    }

    /// Failures that need a spec or credentials change; surfaced on the `Ready` condition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconcilerError::TerminalDrift(_)
                | ReconcilerError::InvalidSpec(_)
                | ReconcilerError::Api(ApiError::Rejected { .. })
                | ReconcilerError::Credentials(
                    CredentialsError::Unavailable(_) | CredentialsError::Client(_)
                )
        )
    }

    /// Condition reason for this error
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::TerminalDrift(_) => "TerminalDrift",
            ReconcilerError::InvalidSpec(_) => "InvalidSpec",
            ReconcilerError::Credentials(_) => "CredentialsUnavailable",
            ReconcilerError::Api(ApiError::Rejected { .. }) => "APIRequestRejected",
            ReconcilerError::Conflict(_) => "Conflict",
            _ => "ReconciliationFailed",
        }
    }
}
