//! # Kubernetes Providers
//!
//! kube-backed implementations of the collaborator traits.
//!
//! - `store` - finalizer and status writes on `AgentPool` objects
//! - `secrets` - agent token values in a Secret owned by the `AgentPool`
//! - `outputs` - agent pool outputs in a ConfigMap owned by the `AgentPool`
//! - `credentials` - API token lookup and Terraform Cloud client construction

mod credentials;
mod outputs;
mod secrets;
mod store;

pub use credentials::KubeApiClientFactory;
pub use outputs::KubeOutputStore;
pub use secrets::KubeSecretStore;
pub use store::KubeResourceStore;

use crate::crd::AgentPool;
use crate::provider::StoreError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

/// Classify a kube error for the reconciler
pub(crate) fn store_error(error: kube::Error, what: &str) -> StoreError {
    match error {
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict(what.to_string()),
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound(what.to_string()),
        e => StoreError::Other(format!("{what}: {e}")),
    }
}

/// Namespace of an `AgentPool`, `default` when unset
pub(crate) fn namespace_of(pool: &AgentPool) -> String {
    pool.namespace().unwrap_or_else(|| "default".to_string())
}

/// Controller owner reference so dependents are garbage collected with the pool
pub(crate) fn owner_reference(pool: &AgentPool) -> Result<OwnerReference, StoreError> {
    pool.controller_owner_ref(&()).ok_or_else(|| {
        StoreError::Other(format!(
            "AgentPool {} has no uid, cannot own dependents",
            pool.name_any()
        ))
    })
}

/// Name of a dependent object, `<resource>-<suffix>`
pub(crate) fn dependent_name(pool: &AgentPool, suffix: &str) -> String {
    format!("{}-{}", pool.name_any(), suffix)
}
