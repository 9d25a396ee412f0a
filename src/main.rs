//! # Terraform Cloud AgentPool Controller
//!
//! A Kubernetes controller that manages Terraform Cloud agent pools and their agent tokens
//! from `AgentPool` resources.
//!
//! ## Overview
//!
//! For every `AgentPool` the controller:
//!
//! 1. **Ensures the agent pool** - Creates, adopts or renames the pool in the organization
//! 2. **Issues agent tokens** - One token per name in `spec.agentTokens`, values stored in a Secret
//! 3. **Revokes stale tokens** - Tokens removed from the spec are revoked
//! 4. **Publishes outputs** - Pool attributes are written to a ConfigMap
//! 5. **Cleans up** - On deletion, tokens are revoked and the pool is deleted before the
//!    finalizer is released
//!
//! ## Features
//!
//! - **Prometheus metrics**: Exposed on `/metrics`
//! - **Health probes**: `/healthz` and `/readyz`
//! - **Namespace scoping**: `WATCH_NAMESPACE` limits the watch to one namespace

use agent_pool_controller::runtime::initialization::initialize;
use agent_pool_controller::runtime::watch_loop::run_watch_loop;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.pools,
        init_result.reconciler,
        init_result.server_state,
    )
    .await
}
