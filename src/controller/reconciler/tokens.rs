//! # Agent Tokens
//!
//! Converges the agent tokens of a pool on the names listed in the spec. Tokens are matched
//! by name. New tokens are issued before stale ones are revoked, so agents switching to a
//! fresh token are never left without one.
//!
//! Every completed operation is recorded in `pool.status` right away. When a later step
//! fails, the caller persists that progress before reporting the error.

use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{AgentPool, AgentToken};
use crate::observability::metrics;
use crate::provider::{AgentPoolApi, ApiError, RemoteToken, SecretStore};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Token operations needed to reach the desired set
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenPlan {
    /// Names to issue, in spec order
    pub create: Vec<String>,
    /// Tracked tokens no longer wanted
    pub revoke: Vec<AgentToken>,
}

impl TokenPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.revoke.is_empty()
    }
}

/// Diff desired token names against the tracked tokens
pub fn plan_token_changes(desired: &[&str], observed: &[AgentToken]) -> TokenPlan {
    let mut seen = HashSet::new();
    let create = desired
        .iter()
        .filter(|name| seen.insert(**name))
        .filter(|name| !observed.iter().any(|t| t.name == **name))
        .map(|name| (*name).to_string())
        .collect();
    let revoke = observed
        .iter()
        .filter(|t| !desired.contains(&t.name.as_str()))
        .cloned()
        .collect();
    TokenPlan { create, revoke }
}

/// Sync tracked tokens with what Terraform Cloud reports
///
/// Tokens revoked out of band are forgotten so that they get issued again. Returns the
/// number of forgotten tokens.
pub fn refresh_tracked_tokens(tracked: &mut Vec<AgentToken>, remote: &[RemoteToken]) -> usize {
    let before = tracked.len();
    tracked.retain(|token| {
        let present = remote.iter().any(|r| r.id == token.id);
        if !present {
            warn!(
                "Agent token {} ({}) was revoked outside the controller, it will be issued again",
                token.name, token.id
            );
        }
        present
    });
    for token in tracked.iter_mut() {
        if let Some(r) = remote.iter().find(|r| r.id == token.id) {
            token.created_at = r.created_at.or(token.created_at);
            token.last_used_at = r.last_used_at;
        }
    }
    before - tracked.len()
}

/// Issue missing tokens and revoke unwanted ones
pub async fn reconcile_tokens(
    api: &dyn AgentPoolApi,
    secrets: &dyn SecretStore,
    pool: &mut AgentPool,
    pool_id: &str,
) -> Result<(), ReconcilerError> {
    let remote = api.list_tokens(pool_id).await?;
    let status = pool.status.get_or_insert_with(Default::default);
    refresh_tracked_tokens(&mut status.agent_tokens, &remote);

    let plan = plan_token_changes(&pool.spec.agent_token_names(), &status.agent_tokens);
    if plan.is_empty() {
        debug!("Agent tokens are up to date");
        return Ok(());
    }

    info!(
        "Agent token changes: {} to create, {} to revoke",
        plan.create.len(),
        plan.revoke.len()
    );

    for name in plan.create {
        let issued = api.create_token(pool_id, &name).await?;

        if let Err(e) = secrets.persist_secret(pool, &name, &issued.value).await {
            error!(
                "Failed to store value of agent token {} ({}), revoking it: {}",
                name, issued.id, e
            );
            if let Err(revoke_err) = api.revoke_token(&issued.id).await {
                warn!(
                    "Failed to revoke unstored agent token {}: {}",
                    issued.id, revoke_err
                );
            }
            return Err(ReconcilerError::SecretStore { name, source: e });
        }

        info!("✅ Issued agent token {} ({})", name, issued.id);
        metrics::increment_agent_tokens_created();
        pool.status
            .get_or_insert_with(Default::default)
            .agent_tokens
            .push(AgentToken {
                name,
                id: issued.id,
                created_at: issued.created_at,
                last_used_at: None,
            });
    }

    for token in plan.revoke {
        revoke(api, &token).await?;
        secrets
            .remove_secret(pool, &token.name)
            .await
            .map_err(|source| ReconcilerError::SecretStore {
                name: token.name.clone(),
                source,
            })?;
        pool.status
            .get_or_insert_with(Default::default)
            .agent_tokens
            .retain(|t| t.name != token.name);
    }

    Ok(())
}

/// Revoke a token; a token that is already gone counts as revoked
pub async fn revoke(api: &dyn AgentPoolApi, token: &AgentToken) -> Result<(), ReconcilerError> {
    match api.revoke_token(&token.id).await {
        Ok(()) => {
            info!("Revoked agent token {} ({})", token.name, token.id);
            metrics::increment_agent_tokens_revoked();
            Ok(())
        }
        Err(ApiError::NotFound(_)) => {
            debug!("Agent token {} ({}) was already revoked", token.name, token.id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
