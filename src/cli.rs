//! # APCTL CLI
//!
//! Command-line interface for the Terraform Cloud AgentPool controller.
//!
//! ## Usage
//!
//! ```bash
//! # Trigger reconciliation for a specific AgentPool
//! apctl reconcile --namespace default --name builders
//!
//! # List all AgentPool resources
//! apctl list
//!
//! # Show status of an AgentPool
//! apctl status --namespace default --name builders
//! ```

use agent_pool_controller::constants::{FIELD_MANAGER, MANUAL_RECONCILE_ANNOTATION};
use agent_pool_controller::AgentPool;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::{
    api::{Api, Patch, PatchParams},
    Client,
};
use serde_json::json;
use std::collections::BTreeMap;

/// Terraform Cloud AgentPool controller CLI
#[derive(Parser)]
#[command(name = "apctl")]
#[command(about = "Terraform Cloud AgentPool controller CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to "default")
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger reconciliation for an AgentPool resource
    Reconcile {
        /// Name of the AgentPool resource
        #[arg(long)]
        name: String,
    },
    /// List AgentPool resources (all namespaces unless --namespace is given)
    List,
    /// Show status of an AgentPool resource
    Status {
        /// Name of the AgentPool resource
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apctl=info".into()),
        )
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::Reconcile { name } => reconcile_command(client, &name, cli.namespace).await,
        Commands::List => list_command(client, cli.namespace).await,
        Commands::Status { name } => status_command(client, &name, cli.namespace).await,
    }
}

/// Trigger reconciliation by updating an annotation; any change to the object is watched
async fn reconcile_command(client: Client, name: &str, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    println!("Triggering reconciliation for AgentPool '{ns}/{name}'...");

    let api: Api<AgentPool> = Api::namespaced(client, ns);
    let timestamp = chrono::Utc::now().to_rfc3339();
    let annotations = BTreeMap::from([(MANUAL_RECONCILE_ANNOTATION, timestamp.as_str())]);
    let patch = json!({ "metadata": { "annotations": annotations } });

    api.patch(
        name,
        &PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        },
        &Patch::Merge(patch),
    )
    .await
    .with_context(|| format!("Failed to trigger reconciliation for '{ns}/{name}'"))?;

    println!("✅ Reconciliation triggered successfully");
    println!("   Resource: {ns}/{name}");
    println!("   Timestamp: {timestamp}");
    Ok(())
}

/// List AgentPool resources with their pool ID and readiness
async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<AgentPool> = match namespace {
        Some(ns) => Api::namespaced(client, &ns),
        None => Api::all(client),
    };

    let pools = api
        .list(&kube::api::ListParams::default())
        .await
        .context("Failed to list AgentPool resources")?;

    if pools.items.is_empty() {
        println!("No AgentPool resources found.");
        return Ok(());
    }

    println!(
        "{:<30} {:<20} {:<20} {:<10} {:<8}",
        "NAME", "NAMESPACE", "AGENT POOL ID", "READY", "TOKENS"
    );
    println!("{}", "-".repeat(92));

    for pool in pools.items {
        let name = pool.metadata.name.as_deref().unwrap_or("<unknown>");
        let ns = pool.metadata.namespace.as_deref().unwrap_or("<unknown>");
        let status = pool.status.unwrap_or_default();
        let ready = status
            .condition("Ready")
            .map(|c| c.status.as_str())
            .unwrap_or("Unknown");
        let pool_id = if status.agent_pool_id.is_empty() {
            "-"
        } else {
            status.agent_pool_id.as_str()
        };
        println!(
            "{:<30} {:<20} {:<20} {:<10} {:<8}",
            name,
            ns,
            pool_id,
            ready,
            status.agent_tokens.len()
        );
    }

    Ok(())
}

/// Show spec and status of one AgentPool
async fn status_command(client: Client, name: &str, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<AgentPool> = Api::namespaced(client, ns);
    let pool = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get AgentPool '{ns}/{name}'"))?;

    println!("Status for AgentPool '{ns}/{name}':\n");
    if let Some(generation) = pool.metadata.generation {
        println!("Generation: {generation}");
    }

    println!("\nSpec:");
    println!("  Name: {}", pool.spec.name);
    println!("  Organization: {}", pool.spec.organization);
    println!(
        "  Token: secret {} key {}",
        pool.spec.token.secret_key_ref.name, pool.spec.token.secret_key_ref.key
    );
    println!("  Agent Tokens: {}", pool.spec.agent_token_names().join(", "));

    let Some(status) = pool.status else {
        println!("\nStatus: No status available (resource may not have been reconciled yet)");
        return Ok(());
    };

    println!("\nStatus:");
    println!("  Observed Generation: {}", status.observed_generation);
    println!("  Agent Pool ID: {}", status.agent_pool_id);
    for token in &status.agent_tokens {
        println!("  Agent Token: {} ({})", token.name, token.id);
    }

    if !status.conditions.is_empty() {
        println!("\nConditions:");
        for condition in &status.conditions {
            println!("  {}: {}", condition.r#type, condition.status);
            if let Some(ref reason) = condition.reason {
                println!("    Reason: {reason}");
            }
            if let Some(ref message) = condition.message {
                println!("    Message: {message}");
            }
            if let Some(ref time) = condition.last_transition_time {
                println!("    Last Transition: {time}");
            }
        }
    }

    Ok(())
}
