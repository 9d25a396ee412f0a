//! # Agent Pool Outputs
//!
//! Publishes coerced agent pool outputs to a ConfigMap (`<resource>-agent-pool-outputs`)
//! owned by the `AgentPool`. The full set is applied each time, so keys that disappear
//! remotely are dropped.

use super::{dependent_name, namespace_of, owner_reference, store_error};
use crate::constants::{FIELD_MANAGER, OUTPUTS_CONFIG_MAP_SUFFIX};
use crate::crd::AgentPool;
use crate::provider::{OutputStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use std::collections::BTreeMap;

/// `OutputStore` writing to a Kubernetes ConfigMap
#[derive(Clone)]
pub struct KubeOutputStore {
    client: Client,
}

impl std::fmt::Debug for KubeOutputStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeOutputStore").finish_non_exhaustive()
    }
}

impl KubeOutputStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutputStore for KubeOutputStore {
    async fn publish(
        &self,
        owner: &AgentPool,
        outputs: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let namespace = namespace_of(owner);
        let name = dependent_name(owner, OUTPUTS_CONFIG_MAP_SUFFIX);
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &namespace);

        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.clone()),
                owner_references: Some(vec![owner_reference(owner)?]),
                ..ObjectMeta::default()
            },
            data: Some(outputs.clone()),
            ..ConfigMap::default()
        };

        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&config_map),
        )
        .await
        .map_err(|e| store_error(e, &format!("ConfigMap {namespace}/{name}")))?;
        Ok(())
    }
}
