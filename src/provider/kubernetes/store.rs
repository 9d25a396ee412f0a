//! # AgentPool Store
//!
//! Finalizer and status writes. Every patch carries `metadata.resourceVersion`, so the
//! API server rejects writes based on a stale read with 409 Conflict.

use super::{namespace_of, store_error};
use crate::controller::lifecycle::{with_finalizer, without_finalizer};
use crate::crd::AgentPool;
use crate::provider::{ResourceStore, StoreError};
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// `ResourceStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
}

impl std::fmt::Debug for KubeResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceStore").finish_non_exhaustive()
    }
}

impl KubeResourceStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, pool: &AgentPool) -> Api<AgentPool> {
        Api::namespaced(self.client.clone(), &namespace_of(pool))
    }
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn add_finalizer(
        &self,
        pool: &AgentPool,
        finalizer: &str,
    ) -> Result<AgentPool, StoreError> {
        let name = pool.name_any();
        let patch = json!({
            "metadata": {
                "resourceVersion": pool.metadata.resource_version,
                "finalizers": with_finalizer(pool.metadata.finalizers.as_ref(), finalizer),
            }
        });
        self.api(pool)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| store_error(e, &format!("AgentPool {name}")))
    }

    async fn remove_finalizer(&self, pool: &AgentPool, finalizer: &str) -> Result<(), StoreError> {
        let name = pool.name_any();
        let patch = json!({
            "metadata": {
                "resourceVersion": pool.metadata.resource_version,
                "finalizers": without_finalizer(pool.metadata.finalizers.as_ref(), finalizer),
            }
        });
        match self
            .api(pool)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                debug!("AgentPool {} already gone while removing finalizer", name);
                Ok(())
            }
            Err(e) => Err(store_error(e, &format!("AgentPool {name}"))),
        }
    }

    async fn update_status(&self, pool: &AgentPool) -> Result<AgentPool, StoreError> {
        let name = pool.name_any();
        let patch = json!({
            "metadata": {
                "resourceVersion": pool.metadata.resource_version,
            },
            "status": pool.status,
        });
        self.api(pool)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| store_error(e, &format!("AgentPool {name} status")))
    }
}
