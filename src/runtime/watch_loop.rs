//! # Watch Loop
//!
//! Runs the kube-runtime controller for AgentPool resources until a shutdown signal.

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::AgentPool;
use crate::runtime::error_policy::handle_reconciliation_error;
use anyhow::Result;
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::controller::Error as ControllerError;
use kube_runtime::{watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Watch AgentPool resources and reconcile them
///
/// Every change to an AgentPool, including an update of the manual reconcile annotation,
/// schedules a reconciliation. Reconciliations of the same object never overlap.
pub async fn run_watch_loop(
    pools: Api<AgentPool>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    Controller::new(pools, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!("Reconciled {} ({:?})", object, action);
                }
                Err(ControllerError::ReconcilerFailed(e, object)) => {
                    debug!("Reconciliation of {} failed: {}", object, e);
                }
                Err(ControllerError::ObjectNotFound(object)) => {
                    debug!("{} was deleted before it could be reconciled", object);
                }
                Err(e) => {
                    warn!("Watch stream error: {}", e);
                }
            }
        })
        .await;

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controller stopped");
    Ok(())
}
