//! # Agent Pool
//!
//! Ensures the remote agent pool exists and matches the spec.
//!
//! - No pool ID recorded: adopt a pool with the same name in the organization, or create one
//! - Pool ID recorded but gone remotely: create a replacement and forget the old tokens
//! - Spec generation moved: rename the pool when the name changed; an organization change is
//!   terminal drift since a pool cannot move between organizations

use crate::controller::output::format_output;
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::AgentPool;
use crate::observability::metrics;
use crate::provider::{AgentPoolApi, ApiError, PoolState};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Make sure the remote pool exists and reflects the spec
///
/// Records the pool ID in `pool.status`; the caller persists it.
pub async fn ensure_pool(
    api: &dyn AgentPoolApi,
    pool: &mut AgentPool,
) -> Result<PoolState, ReconcilerError> {
    let generation = pool.metadata.generation.unwrap_or_default();
    let (pool_id, observed_generation) = pool
        .status
        .as_ref()
        .map(|s| (s.agent_pool_id.clone(), s.observed_generation))
        .unwrap_or_default();

    if !pool_id.is_empty() {
        match api.get_pool(&pool_id).await {
            Ok(remote) if observed_generation != generation => {
                return reconcile_drift(api, pool, remote).await;
            }
            Ok(remote) => return Ok(remote),
            Err(ApiError::NotFound(_)) => {
                warn!(
                    "Agent pool {} no longer exists in Terraform Cloud, creating a replacement",
                    pool_id
                );
                let status = pool.status.get_or_insert_with(Default::default);
                status.agent_pool_id.clear();
                status.agent_tokens.clear();
            }
            Err(e) => return Err(e.into()),
        }
    }

    let remote = adopt_or_create(api, pool).await?;
    let status = pool.status.get_or_insert_with(Default::default);
    status.agent_pool_id = remote.id.clone();
    Ok(remote)
}

async fn adopt_or_create(
    api: &dyn AgentPoolApi,
    pool: &AgentPool,
) -> Result<PoolState, ReconcilerError> {
    let spec = &pool.spec;
    if let Some(existing) = api.find_pool(&spec.organization, &spec.name).await? {
        info!(
            "Adopting existing agent pool {} ({}) in organization {}",
            existing.name, existing.id, spec.organization
        );
        metrics::increment_agent_pools_adopted();
        return Ok(existing);
    }

    let created = api.create_pool(&spec.organization, &spec.name).await?;
    info!(
        "✅ Created agent pool {} ({}) in organization {}",
        created.name, created.id, spec.organization
    );
    metrics::increment_agent_pools_created();
    Ok(created)
}

async fn reconcile_drift(
    api: &dyn AgentPoolApi,
    pool: &AgentPool,
    remote: PoolState,
) -> Result<PoolState, ReconcilerError> {
    let spec = &pool.spec;

    if !remote.organization.is_empty() && remote.organization != spec.organization {
        metrics::increment_drift_detected();
        return Err(ReconcilerError::TerminalDrift(format!(
            "agent pool {} belongs to organization '{}' but the resource now requests '{}'; \
             an agent pool cannot move between organizations",
            remote.id, remote.organization, spec.organization
        )));
    }

    if remote.name != spec.name {
        info!(
            "Renaming agent pool {} from '{}' to '{}'",
            remote.id, remote.name, spec.name
        );
        return Ok(api.update_pool(&remote.id, &spec.name).await?);
    }

    Ok(remote)
}

/// Flatten the remote pool into string outputs
pub fn pool_outputs(remote: &PoolState) -> BTreeMap<String, String> {
    let mut outputs: BTreeMap<String, String> = remote
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), format_output(value)))
        .collect();
    outputs.insert("agentPoolID".to_string(), remote.id.clone());
    outputs.insert("name".to_string(), remote.name.clone());
    if !remote.organization.is_empty() {
        outputs.insert("organization".to_string(), remote.organization.clone());
    }
    outputs
}
