//! # Metrics Module
//!
//! Prometheus metrics for monitoring the controller, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup and registration
//! - `controller_metrics` - Reconciliations, requeues, agent pool and agent token operations
//! - `api_metrics` - Terraform Cloud API requests

pub mod api_metrics;
pub mod controller_metrics;
pub mod registry;

pub use api_metrics::*;
pub use controller_metrics::*;
pub use registry::*;
