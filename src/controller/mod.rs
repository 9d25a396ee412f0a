//! # Controller
//!
//! Reconciliation engine for `AgentPool` resources.
//!
//! - `lifecycle` - Finalizer predicates shared by any Kubernetes object
//! - `output` - Coercion of untyped Terraform Cloud values into strings
//! - `requeue` - Outcome to scheduling decisions
//! - `backoff` - Exponential backoff for failing resources
//! - `reconciler` - Convergence of desired and observed state
//! - `server` - Metrics and probe HTTP server

pub mod backoff;
pub mod lifecycle;
pub mod output;
pub mod reconciler;
pub mod requeue;
pub mod server;
