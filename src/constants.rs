//! # Constants
//!
//! Names and default values shared across the controller.

/// Finalizer marking that Terraform Cloud cleanup is still owed for an `AgentPool`
pub const AGENT_POOL_FINALIZER: &str = "agentpool.app.terraform.io/finalizer";

/// Field manager used for server-side apply and patches
pub const FIELD_MANAGER: &str = "terraform-cloud-operator";

/// Annotation written by `apctl reconcile` to force a reconciliation
pub const MANUAL_RECONCILE_ANNOTATION: &str = "agentpool.app.terraform.io/reconcile";

/// Suffix of the Secret holding agent token values (`<resource>-agent-tokens`)
pub const AGENT_TOKENS_SECRET_SUFFIX: &str = "agent-tokens";

/// Suffix of the ConfigMap holding agent pool outputs (`<resource>-agent-pool-outputs`)
pub const OUTPUTS_CONFIG_MAP_SUFFIX: &str = "agent-pool-outputs";

/// Terraform Cloud address used when `TFC_ADDRESS` is not set
pub const DEFAULT_TFC_ADDRESS: &str = "https://app.terraform.io";

/// Periodic resync interval after a successful reconciliation
pub const DEFAULT_SYNC_PERIOD: &str = "5m";

/// Lower bound of the per-resource exponential backoff (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Upper bound of the per-resource exponential backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Delay before retrying a pass that lost a status write race (seconds)
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 1;

/// HTTP timeout for Terraform Cloud API calls (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Metrics and probe server port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// How long to wait for the HTTP server to bind during startup (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Server readiness poll interval during startup (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
