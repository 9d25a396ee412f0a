//! # Error Policy
//!
//! Requeue decisions for reconciliations that returned an error.
//!
//! - Status write conflicts are retried quickly with a fixed delay
//! - Everything else backs off exponentially, per resource

use crate::controller::reconciler::{resource_key, Reconciler, ReconcilerError};
use crate::crd::AgentPool;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handle reconciliation errors with exponential backoff
///
/// Backoff state is tracked per resource so one failing resource does not slow down others.
pub fn handle_reconciliation_error(
    obj: Arc<AgentPool>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    if let ReconcilerError::Conflict(_) = error {
        let delay = ctx.conflict_requeue();
        warn!(
            "Status write conflict for {}, retrying in {}s with a fresh copy",
            name,
            delay.as_secs()
        );
        observability::metrics::increment_requeues_total("conflict");
        return Action::requeue(delay);
    }

    error!("Reconciliation error for {}: {}", name, error);
    observability::metrics::increment_reconciliation_errors();

    let (delay, error_count) = ctx.next_backoff(&resource_key(&obj));
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(delay.as_secs()).unwrap_or(i64::MAX));

    info!(
        "🔄 Retrying with exponential backoff: {}s (error count: {}, transient: {})",
        delay.as_secs(),
        error_count,
        error.is_transient()
    );
    info!("📅 Next retry scheduled: {}", next_trigger_time.to_rfc3339());

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}
