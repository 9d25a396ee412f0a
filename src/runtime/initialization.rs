//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and reconciler setup.

use crate::config::{load_config, ControllerConfig, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::AgentPool;
use crate::observability;
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for AgentPool resources, scoped to the watched namespace
    pub pools: Api<AgentPool>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

/// Initialize the controller runtime
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before any client touches rustls
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_pool_controller=info".into()),
        )
        .init();

    info!(
        "Starting Terraform Cloud AgentPool controller v{}",
        env!("CARGO_PKG_VERSION")
    );

    let (controller_config, server_config) = load_config()?;
    info!(
        "Configuration: address={}, sync_period={:?}, namespace={}",
        controller_config.tfc_address,
        controller_config.sync_period,
        controller_config
            .watch_namespace
            .as_deref()
            .unwrap_or("<all>")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let pools = pools_api(client.clone(), &controller_config);
    let reconciler = Arc::new(Reconciler::new(client.clone(), controller_config));

    summarize_existing_resources(&pools).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        pools,
        reconciler,
        server_state,
    })
}

/// AgentPool API for the configured namespace, or all namespaces
pub fn pools_api(client: Client, config: &ControllerConfig) -> Api<AgentPool> {
    match &config.watch_namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = std::time::Duration::from_secs(config.startup_timeout_secs);
    let poll_interval = std::time::Duration::from_millis(config.poll_interval_ms);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state
            .is_ready
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log the AgentPool resources present at startup, grouped by namespace
///
/// Also verifies the CRD is installed; a failure is logged and the watch loop retries.
async fn summarize_existing_resources(pools: &Api<AgentPool>) {
    match pools.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                by_namespace
                    .entry(item.metadata.namespace.clone().unwrap_or_default())
                    .or_default()
                    .push(item.metadata.name.clone().unwrap_or_default());
            }

            info!(
                "CRD is queryable, found {} existing AgentPool resources in {} namespaces",
                list.items.len(),
                by_namespace.len()
            );
            for (namespace, mut names) in by_namespace {
                names.sort();
                info!("  {}: {}", namespace, names.join(", "));
            }
        }
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
