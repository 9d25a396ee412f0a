//! In-memory fakes for Terraform Cloud and the Kubernetes object store.
//!
//! Both fakes append every mutating call to a shared [`Journal`] so tests can assert on the
//! order of operations across systems.

use agent_pool_controller::constants::AGENT_POOL_FINALIZER;
use agent_pool_controller::controller::lifecycle::{with_finalizer, without_finalizer};
use agent_pool_controller::controller::output::OutputValue;
use agent_pool_controller::crd::AgentPool;
use agent_pool_controller::provider::{
    AgentPoolApi, ApiClientFactory, ApiError, CredentialsError, IssuedToken, OutputStore,
    PoolState, RemoteToken, ResourceStore, SecretStore, StoreError,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

/// Ordered log of mutating calls, e.g. `create_token b`
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries starting with `prefix`
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Injected API failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Transient,
    NotFound,
    Rejected,
}

impl Failure {
    fn to_error(self, what: &str) -> ApiError {
        match self {
            Failure::Transient => ApiError::Transient(format!("{what}: HTTP 503")),
            Failure::NotFound => ApiError::NotFound(what.to_string()),
            Failure::Rejected => ApiError::Rejected {
                status: 401,
                message: format!("{what}: unauthorized"),
            },
        }
    }
}

#[derive(Debug, Default)]
struct TfcState {
    pools: BTreeMap<String, PoolState>,
    /// token ID -> (pool ID, token)
    tokens: BTreeMap<String, (String, RemoteToken)>,
    next_id: u32,
    /// Keyed by `operation` or `operation:argument`
    failures: HashMap<String, Failure>,
}

/// Fake Terraform Cloud
#[derive(Debug)]
pub struct FakeTfc {
    journal: Journal,
    state: Mutex<TfcState>,
}

impl FakeTfc {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Mutex::new(TfcState::default()),
        }
    }

    /// Fail every call to `operation`, or only those for `operation:argument`
    pub fn fail(&self, key: &str, failure: Failure) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(key.to_string(), failure);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn pools(&self) -> Vec<PoolState> {
        self.state.lock().unwrap().pools.values().cloned().collect()
    }

    /// Names of active tokens of `pool_id`
    pub fn token_names(&self, pool_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .tokens
            .values()
            .filter(|(pool, _)| pool == pool_id)
            .map(|(_, token)| token.name.clone())
            .collect()
    }

    /// Delete a pool and its tokens behind the controller's back
    pub fn delete_out_of_band(&self, pool_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.pools.remove(pool_id);
        state.tokens.retain(|_, (pool, _)| pool != pool_id);
    }

    /// Revoke a token behind the controller's back
    pub fn revoke_out_of_band(&self, token_id: &str) {
        self.state.lock().unwrap().tokens.remove(token_id);
    }

    fn check(&self, operation: &str, argument: &str) -> Result<(), ApiError> {
        let state = self.state.lock().unwrap();
        let failure = state
            .failures
            .get(&format!("{operation}:{argument}"))
            .or_else(|| state.failures.get(operation));
        match failure {
            Some(failure) => Err(failure.to_error(&format!("{operation} {argument}"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AgentPoolApi for FakeTfc {
    async fn get_pool(&self, pool_id: &str) -> Result<PoolState, ApiError> {
        self.check("get_pool", pool_id)?;
        self.state
            .lock()
            .unwrap()
            .pools
            .get(pool_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("agent pool {pool_id}")))
    }

    async fn find_pool(
        &self,
        organization: &str,
        name: &str,
    ) -> Result<Option<PoolState>, ApiError> {
        self.check("find_pool", name)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .pools
            .values()
            .find(|p| p.organization == organization && p.name == name)
            .cloned())
    }

    async fn create_pool(&self, organization: &str, name: &str) -> Result<PoolState, ApiError> {
        self.check("create_pool", name)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("apool-{}", state.next_id);
        let mut attributes = BTreeMap::new();
        attributes.insert("organization-scoped".to_string(), OutputValue::Bool(true));
        attributes.insert("agent-count".to_string(), OutputValue::Number(0.0));
        let pool = PoolState {
            id: id.clone(),
            name: name.to_string(),
            organization: organization.to_string(),
            attributes,
        };
        state.pools.insert(id.clone(), pool.clone());
        self.journal.record(format!("create_pool {name}"));
        Ok(pool)
    }

    async fn update_pool(&self, pool_id: &str, name: &str) -> Result<PoolState, ApiError> {
        self.check("update_pool", pool_id)?;
        let mut state = self.state.lock().unwrap();
        let pool = state
            .pools
            .get_mut(pool_id)
            .ok_or_else(|| ApiError::NotFound(format!("agent pool {pool_id}")))?;
        pool.name = name.to_string();
        self.journal.record(format!("update_pool {pool_id} {name}"));
        Ok(pool.clone())
    }

    async fn delete_pool(&self, pool_id: &str) -> Result<(), ApiError> {
        self.check("delete_pool", pool_id)?;
        let mut state = self.state.lock().unwrap();
        if state.pools.remove(pool_id).is_none() {
            return Err(ApiError::NotFound(format!("agent pool {pool_id}")));
        }
        state.tokens.retain(|_, (pool, _)| pool != pool_id);
        self.journal.record(format!("delete_pool {pool_id}"));
        Ok(())
    }

    async fn list_tokens(&self, pool_id: &str) -> Result<Vec<RemoteToken>, ApiError> {
        self.check("list_tokens", pool_id)?;
        let state = self.state.lock().unwrap();
        if !state.pools.contains_key(pool_id) {
            return Err(ApiError::NotFound(format!("agent pool {pool_id}")));
        }
        Ok(state
            .tokens
            .values()
            .filter(|(pool, _)| pool == pool_id)
            .map(|(_, token)| token.clone())
            .collect())
    }

    async fn create_token(&self, pool_id: &str, name: &str) -> Result<IssuedToken, ApiError> {
        self.check("create_token", name)?;
        let mut state = self.state.lock().unwrap();
        if !state.pools.contains_key(pool_id) {
            return Err(ApiError::NotFound(format!("agent pool {pool_id}")));
        }
        state.next_id += 1;
        let id = format!("at-{}", state.next_id);
        let created_at = Some(1_700_000_000 + i64::from(state.next_id));
        state.tokens.insert(
            id.clone(),
            (
                pool_id.to_string(),
                RemoteToken {
                    id: id.clone(),
                    name: name.to_string(),
                    created_at,
                    last_used_at: None,
                },
            ),
        );
        self.journal.record(format!("create_token {name}"));
        Ok(IssuedToken {
            id: id.clone(),
            value: Zeroizing::new(format!("secret-{id}")),
            created_at,
        })
    }

    async fn revoke_token(&self, token_id: &str) -> Result<(), ApiError> {
        self.check("revoke_token", token_id)?;
        let mut state = self.state.lock().unwrap();
        match state.tokens.remove(token_id) {
            Some((_, token)) => {
                self.journal
                    .record(format!("revoke_token {} {}", token.name, token_id));
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("agent token {token_id}"))),
        }
    }
}

/// Hands out the fake client, or fails like a missing token Secret
#[derive(Debug)]
pub struct FakeCredentials {
    tfc: Arc<FakeTfc>,
    unavailable: Mutex<bool>,
}

impl FakeCredentials {
    pub fn new(tfc: Arc<FakeTfc>) -> Self {
        Self {
            tfc,
            unavailable: Mutex::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

#[async_trait]
impl ApiClientFactory for FakeCredentials {
    async fn client_for(
        &self,
        _pool: &AgentPool,
    ) -> Result<Arc<dyn AgentPoolApi>, CredentialsError> {
        if *self.unavailable.lock().unwrap() {
            return Err(CredentialsError::Unavailable(
                "secret ci/tfc-operator not found".to_string(),
            ));
        }
        Ok(self.tfc.clone())
    }
}

#[derive(Debug, Default)]
struct ClusterState {
    object: Option<AgentPool>,
    secrets: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
    status_writes: usize,
    conflict_next_status_write: bool,
    fail_secret_persist: bool,
}

/// Fake Kubernetes object store holding a single AgentPool
///
/// Writes are rejected with a conflict when the caller's `resourceVersion` is stale.
#[derive(Debug)]
pub struct FakeCluster {
    journal: Journal,
    state: Mutex<ClusterState>,
}

impl FakeCluster {
    pub fn new(journal: Journal, pool: AgentPool) -> Self {
        Self {
            journal,
            state: Mutex::new(ClusterState {
                object: Some(pool),
                ..ClusterState::default()
            }),
        }
    }

    /// Current stored object, `None` once purged
    pub fn current(&self) -> Option<AgentPool> {
        self.state.lock().unwrap().object.clone()
    }

    /// Apply a spec change the way the API server does: bump generation and version
    pub fn edit_spec(&self, edit: impl FnOnce(&mut AgentPool)) {
        let mut state = self.state.lock().unwrap();
        let object = state.object.as_mut().expect("object exists");
        edit(object);
        object.metadata.generation = Some(object.metadata.generation.unwrap_or_default() + 1);
        bump_version(object);
    }

    /// Mark the object for deletion
    pub fn request_deletion(&self) {
        let mut state = self.state.lock().unwrap();
        let object = state.object.take().expect("object exists");
        let mut value = serde_json::to_value(&object).unwrap();
        value["metadata"]["deletionTimestamp"] = serde_json::json!("2024-01-01T00:00:00Z");
        let mut object: AgentPool = serde_json::from_value(value).unwrap();
        bump_version(&mut object);
        state.object = Some(object);
    }

    pub fn secrets(&self) -> BTreeMap<String, String> {
        self.state.lock().unwrap().secrets.clone()
    }

    pub fn outputs(&self) -> BTreeMap<String, String> {
        self.state.lock().unwrap().outputs.clone()
    }

    pub fn status_writes(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }

    pub fn conflict_next_status_write(&self) {
        self.state.lock().unwrap().conflict_next_status_write = true;
    }

    pub fn fail_secret_persist(&self, fail: bool) {
        self.state.lock().unwrap().fail_secret_persist = fail;
    }

    fn stored<'a>(
        state: &'a mut ClusterState,
        pool: &AgentPool,
    ) -> Result<&'a mut AgentPool, StoreError> {
        let object = state
            .object
            .as_mut()
            .ok_or_else(|| StoreError::NotFound("AgentPool ci/builders".to_string()))?;
        if object.metadata.resource_version != pool.metadata.resource_version {
            return Err(StoreError::Conflict("AgentPool ci/builders".to_string()));
        }
        Ok(object)
    }
}

fn bump_version(object: &mut AgentPool) {
    let version: u64 = object
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    object.metadata.resource_version = Some((version + 1).to_string());
}

#[async_trait]
impl ResourceStore for FakeCluster {
    async fn add_finalizer(
        &self,
        pool: &AgentPool,
        finalizer: &str,
    ) -> Result<AgentPool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let object = Self::stored(&mut state, pool)?;
        object.metadata.finalizers = Some(with_finalizer(
            object.metadata.finalizers.as_ref(),
            finalizer,
        ));
        bump_version(object);
        self.journal.record("add_finalizer");
        Ok(object.clone())
    }

    async fn remove_finalizer(&self, pool: &AgentPool, finalizer: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let object = match Self::stored(&mut state, pool) {
            Err(StoreError::NotFound(_)) => return Ok(()),
            other => other?,
        };
        let remaining = without_finalizer(object.metadata.finalizers.as_ref(), finalizer);
        let purge = object.metadata.deletion_timestamp.is_some() && remaining.is_empty();
        object.metadata.finalizers = Some(remaining);
        bump_version(object);
        if purge {
            state.object = None;
        }
        self.journal.record("remove_finalizer");
        Ok(())
    }

    async fn update_status(&self, pool: &AgentPool) -> Result<AgentPool, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.conflict_next_status_write {
            state.conflict_next_status_write = false;
            return Err(StoreError::Conflict("AgentPool ci/builders".to_string()));
        }
        state.status_writes += 1;
        let object = Self::stored(&mut state, pool)?;
        object.status.clone_from(&pool.status);
        bump_version(object);
        Ok(object.clone())
    }
}

#[async_trait]
impl SecretStore for FakeCluster {
    async fn persist_secret(
        &self,
        _owner: &AgentPool,
        name: &str,
        value: &Zeroizing<String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_secret_persist {
            return Err(StoreError::Other("secrets is forbidden".to_string()));
        }
        state.secrets.insert(name.to_string(), value.to_string());
        self.journal.record(format!("persist_secret {name}"));
        Ok(())
    }

    async fn remove_secret(&self, _owner: &AgentPool, name: &str) -> Result<(), StoreError> {
        self.state.lock().unwrap().secrets.remove(name);
        self.journal.record(format!("remove_secret {name}"));
        Ok(())
    }
}

#[async_trait]
impl OutputStore for FakeCluster {
    async fn publish(
        &self,
        _owner: &AgentPool,
        outputs: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.state.lock().unwrap().outputs.clone_from(outputs);
        Ok(())
    }
}

/// The finalizer this controller owns is present on the stored object
pub fn has_finalizer(pool: &AgentPool) -> bool {
    pool.metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|f| f == AGENT_POOL_FINALIZER))
}
