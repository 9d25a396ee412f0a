//! # API Token Resolution
//!
//! Reads the Terraform Cloud API token referenced by `spec.token.secretKeyRef` and builds
//! a `TfcClient` for the pass.

use super::namespace_of;
use crate::config::ControllerConfig;
use crate::crd::AgentPool;
use crate::provider::tfc::TfcClient;
use crate::provider::{AgentPoolApi, ApiClientFactory, CredentialsError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

/// `ApiClientFactory` reading API tokens from Kubernetes Secrets
#[derive(Clone)]
pub struct KubeApiClientFactory {
    client: Client,
    address: String,
    timeout: Duration,
}

impl std::fmt::Debug for KubeApiClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeApiClientFactory")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl KubeApiClientFactory {
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            client,
            address: config.tfc_address.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    async fn read_token(&self, pool: &AgentPool) -> Result<Zeroizing<String>, CredentialsError> {
        let namespace = namespace_of(pool);
        let selector = &pool.spec.token.secret_key_ref;
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);

        let secret = match api.get(&selector.name).await {
            Ok(secret) => secret,
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                return Err(CredentialsError::Unavailable(format!(
                    "Secret {namespace}/{} not found",
                    selector.name
                )));
            }
            Err(e) => return Err(CredentialsError::Lookup(e.to_string())),
        };

        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&selector.key))
            .ok_or_else(|| {
                CredentialsError::Unavailable(format!(
                    "key {} missing from Secret {namespace}/{}",
                    selector.key, selector.name
                ))
            })?;

        let token = String::from_utf8(bytes.0.clone()).map_err(|_| {
            CredentialsError::Unavailable(format!(
                "key {} of Secret {namespace}/{} is not valid UTF-8",
                selector.key, selector.name
            ))
        })?;
        let token = Zeroizing::new(token.trim().to_string());
        if token.is_empty() {
            return Err(CredentialsError::Unavailable(format!(
                "key {} of Secret {namespace}/{} is empty",
                selector.key, selector.name
            )));
        }
        Ok(token)
    }
}

#[async_trait]
impl ApiClientFactory for KubeApiClientFactory {
    async fn client_for(
        &self,
        pool: &AgentPool,
    ) -> Result<Arc<dyn AgentPoolApi>, CredentialsError> {
        let token = self.read_token(pool).await?;
        let client = TfcClient::new(&self.address, token, self.timeout)
            .map_err(|e| CredentialsError::Client(e.to_string()))?;
        Ok(Arc::new(client))
    }
}
