//! # Agent Token Secret
//!
//! Token values live in one Secret per `AgentPool` (`<resource>-agent-tokens`), one key
//! per agent token name. The Secret is owned by the `AgentPool`.

use super::{dependent_name, namespace_of, owner_reference, store_error};
use crate::constants::{AGENT_TOKENS_SECRET_SUFFIX, FIELD_MANAGER};
use crate::crd::AgentPool;
use crate::provider::{SecretStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::Zeroizing;

/// `SecretStore` writing to a Kubernetes Secret
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Field manager for merge patches
fn merge_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PatchParams::default()
    }
}

/// Single-key `data` map for a merge patch
fn data_entry(name: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(name.to_string(), value);
    map
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn persist_secret(
        &self,
        owner: &AgentPool,
        name: &str,
        value: &Zeroizing<String>,
    ) -> Result<(), StoreError> {
        let namespace = namespace_of(owner);
        let secret_name = dependent_name(owner, AGENT_TOKENS_SECRET_SUFFIX);
        let what = format!("Secret {namespace}/{secret_name}");
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        let data = ByteString(value.as_bytes().to_vec());

        match api.get_opt(&secret_name).await.map_err(|e| store_error(e, &what))? {
            Some(_) => {
                let encoded = serde_json::to_value(&data)
                    .map_err(|e| StoreError::Other(format!("{what}: {e}")))?;
                let patch = json!({ "data": data_entry(name, encoded) });
                api.patch(
                    &secret_name,
                    &merge_params(),
                    &Patch::Merge(&patch),
                )
                .await
                .map_err(|e| store_error(e, &what))?;
            }
            None => {
                let secret = Secret {
                    metadata: ObjectMeta {
                        name: Some(secret_name.clone()),
                        namespace: Some(namespace.clone()),
                        owner_references: Some(vec![owner_reference(owner)?]),
                        ..ObjectMeta::default()
                    },
                    type_: Some("Opaque".to_string()),
                    data: Some(BTreeMap::from([(name.to_string(), data)])),
                    ..Secret::default()
                };
                api.create(&PostParams::default(), &secret)
                    .await
                    .map_err(|e| store_error(e, &what))?;
            }
        }

        debug!("Stored agent token {} in {}", name, what);
        Ok(())
    }

    async fn remove_secret(&self, owner: &AgentPool, name: &str) -> Result<(), StoreError> {
        let namespace = namespace_of(owner);
        let secret_name = dependent_name(owner, AGENT_TOKENS_SECRET_SUFFIX);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        let patch = json!({ "data": data_entry(name, Value::Null) });

        match api
            .patch(
                &secret_name,
                &merge_params(),
                &Patch::Merge(&patch),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(()),
            Err(e) => Err(store_error(e, &format!("Secret {namespace}/{secret_name}"))),
        }
    }
}
