//! # Reconciler
//!
//! Drives an AgentPool resource towards its spec.
//!
//! One pass:
//! 1. Deleted resources holding the finalizer are torn down (see [`deletion`])
//! 2. The finalizer is added so teardown can run later
//! 3. The spec is validated and a Terraform Cloud client is built from the token Secret
//! 4. The agent pool is ensured (see [`pool`]), then its tokens (see [`tokens`])
//! 5. Outputs are published and `observedGeneration` advances
//!
//! Status progress is written before an error is returned. Terminal errors are surfaced on
//! the `Ready` condition and retried with backoff; other errors go to the error policy.

pub mod deletion;
pub mod pool;
pub mod status;
pub mod tokens;
pub mod types;
pub mod validation;

pub use types::{BackoffState, Reconciler, ReconcilerError};

use crate::constants::AGENT_POOL_FINALIZER;
use crate::controller::lifecycle::{
    is_deletion_candidate, lifecycle_state, needs_finalizer_add, LifecycleState,
};
use crate::controller::requeue::{do_not_requeue, requeue_after, requeue_on_err};
use crate::crd::{AgentPool, AgentPoolStatus};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Reconcile one AgentPool
pub async fn reconcile(
    obj: Arc<AgentPool>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let span = info_span!(
        "controller.reconcile",
        resource.name = %name,
        resource.namespace = %namespace
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations();
        let result = reconcile_pool(&obj, &ctx).await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        result
    }
    .instrument(span)
    .await
}

/// `namespace/name` key used for per-resource backoff
pub fn resource_key(pool: &AgentPool) -> String {
    format!(
        "{}/{}",
        pool.namespace().unwrap_or_default(),
        pool.name_any()
    )
}

async fn reconcile_pool(obj: &AgentPool, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    let key = resource_key(obj);

    if is_deletion_candidate(obj, AGENT_POOL_FINALIZER) {
        info!("AgentPool marked for deletion, cleaning up");
        deletion::finalize(obj, ctx).await?;
        ctx.reset_backoff(&key);
        return do_not_requeue();
    }
    if lifecycle_state(obj, AGENT_POOL_FINALIZER) == LifecycleState::Purged {
        debug!("AgentPool is being deleted and already released");
        return do_not_requeue();
    }

    let mut pool = obj.clone();
    if needs_finalizer_add(&pool, AGENT_POOL_FINALIZER) {
        info!("Adding finalizer {}", AGENT_POOL_FINALIZER);
        pool = ctx
            .resources
            .add_finalizer(&pool, AGENT_POOL_FINALIZER)
            .await?;
    }

    match converge(&mut pool, ctx).await {
        Ok(()) => {
            ctx.reset_backoff(&key);
            match ctx.config.sync_period {
                Some(period) => {
                    metrics::increment_requeues_total("sync-period");
                    requeue_after(period)
                }
                None => do_not_requeue(),
            }
        }
        Err(e) if e.is_terminal() => {
            let (delay, error_count) = ctx.next_backoff(&key);
            warn!(
                "❌ Reconciliation cannot proceed until the resource changes: {} (retry in {}s, error count: {})",
                e,
                delay.as_secs(),
                error_count
            );
            metrics::increment_reconciliation_errors();
            let status = pool.status.get_or_insert_with(AgentPoolStatus::default);
            status::set_failed(status, &e);
            if pool.status != obj.status {
                ctx.resources.update_status(&pool).await?;
            }
            metrics::increment_requeues_total("terminal-backoff");
            requeue_after(delay)
        }
        Err(e) => requeue_on_err(e),
    }
}

/// Bring the remote pool and tokens in line with the spec
async fn converge(pool: &mut AgentPool, ctx: &Reconciler) -> Result<(), ReconcilerError> {
    validation::validate_agent_pool_spec(&pool.spec)
        .map_err(|e| ReconcilerError::InvalidSpec(e.to_string()))?;

    let api = ctx.api_factory.client_for(pool).await?;
    let mut persisted = pool.status.clone();

    let remote = pool::ensure_pool(api.as_ref(), pool).await?;
    persist_status(pool, ctx, &mut persisted).await?;

    let token_result =
        tokens::reconcile_tokens(api.as_ref(), ctx.secrets.as_ref(), pool, &remote.id).await;
    if let Err(e) = token_result {
        if !matches!(e, ReconcilerError::Conflict(_)) {
            if let Err(write_err) = persist_status(pool, ctx, &mut persisted).await {
                warn!("Failed to record agent token progress: {}", write_err);
            }
        }
        return Err(e);
    }

    ctx.outputs
        .publish(pool, &pool::pool_outputs(&remote))
        .await?;

    let generation = pool.metadata.generation.unwrap_or_default();
    let status = pool.status.get_or_insert_with(AgentPoolStatus::default);
    status.observed_generation = generation;
    status::set_ready(status);
    persist_status(pool, ctx, &mut persisted).await?;

    info!("✅ AgentPool reconciled (pool {})", remote.id);
    Ok(())
}

/// Write the status when it differs from the last persisted one
async fn persist_status(
    pool: &mut AgentPool,
    ctx: &Reconciler,
    persisted: &mut Option<AgentPoolStatus>,
) -> Result<(), ReconcilerError> {
    if pool.status == *persisted {
        return Ok(());
    }
    *pool = ctx.resources.update_status(pool).await?;
    persisted.clone_from(&pool.status);
    Ok(())
}
