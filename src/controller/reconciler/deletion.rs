//! # Deletion
//!
//! Tears down the remote objects of an AgentPool marked for deletion, then releases the
//! finalizer. Tokens are revoked before the pool is deleted. A failure at any step keeps the
//! finalizer so the next pass resumes where this one stopped; token values Secret and outputs
//! ConfigMap are owned by the resource and garbage-collected with it.

use crate::constants::AGENT_POOL_FINALIZER;
use crate::controller::reconciler::tokens::revoke;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::AgentPool;
use crate::observability::metrics;
use crate::provider::ApiError;
use tracing::{debug, info, warn};

/// Revoke every tracked token, delete the pool and remove the finalizer
pub async fn finalize(obj: &AgentPool, ctx: &Reconciler) -> Result<(), ReconcilerError> {
    let mut pool = obj.clone();
    let status = pool.status.clone().unwrap_or_default();

    if status.agent_pool_id.is_empty() && status.agent_tokens.is_empty() {
        debug!("No remote agent pool recorded, nothing to clean up");
    } else {
        let api = ctx.api_factory.client_for(&pool).await?;

        let mut outcome = Ok(());
        for token in &status.agent_tokens {
            if let Err(e) = revoke(api.as_ref(), token).await {
                outcome = Err(e);
                break;
            }
            if let Some(s) = pool.status.as_mut() {
                s.agent_tokens.retain(|t| t.name != token.name);
            }
        }

        if pool.status.as_ref().map(|s| &s.agent_tokens) != Some(&status.agent_tokens) {
            match ctx.resources.update_status(&pool).await {
                Ok(updated) => pool = updated,
                Err(e) if outcome.is_ok() => return Err(e.into()),
                Err(e) => warn!("Failed to record revoked agent tokens: {}", e),
            }
        }
        outcome?;

        if !status.agent_pool_id.is_empty() {
            match api.delete_pool(&status.agent_pool_id).await {
                Ok(()) => {
                    info!("🗑️ Deleted agent pool {}", status.agent_pool_id);
                    metrics::increment_agent_pools_deleted();
                }
                Err(ApiError::NotFound(_)) => {
                    debug!("Agent pool {} was already deleted", status.agent_pool_id);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    ctx.resources
        .remove_finalizer(&pool, AGENT_POOL_FINALIZER)
        .await?;
    info!("Removed finalizer");
    Ok(())
}
