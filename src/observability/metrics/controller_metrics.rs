//! # Controller Metrics
//!
//! Metrics for controller operations: reconciliations, requeues, agent pools and agent tokens.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

// Controller reconciliation metrics
static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tfc_agent_pool_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tfc_agent_pool_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "tfc_agent_pool_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

// Agent pool metrics
static AGENT_POOL_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tfc_agent_pool_pool_operations_total",
            "Total number of agent pool operations performed in Terraform Cloud",
        ),
        &["operation"],
    )
    .expect("Failed to create AGENT_POOL_OPERATIONS_TOTAL metric - this should never happen")
});

static DRIFT_DETECTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tfc_agent_pool_terminal_drift_total",
        "Total number of unrecoverable spec changes detected",
    )
    .expect("Failed to create DRIFT_DETECTED_TOTAL metric - this should never happen")
});

// Agent token metrics
static AGENT_TOKENS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tfc_agent_pool_tokens_created_total",
        "Total number of agent tokens issued",
    )
    .expect("Failed to create AGENT_TOKENS_CREATED_TOTAL metric - this should never happen")
});

static AGENT_TOKENS_REVOKED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tfc_agent_pool_tokens_revoked_total",
        "Total number of agent tokens revoked",
    )
    .expect("Failed to create AGENT_TOKENS_REVOKED_TOTAL metric - this should never happen")
});

// Requeue metrics
static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tfc_agent_pool_requeues_total",
            "Total number of reconciliation requeues",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(AGENT_POOL_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DRIFT_DETECTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(AGENT_TOKENS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(AGENT_TOKENS_REVOKED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

// Public functions for controller metrics

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_agent_pools_created() {
    AGENT_POOL_OPERATIONS_TOTAL
        .with_label_values(&["create"])
        .inc();
}

pub fn increment_agent_pools_adopted() {
    AGENT_POOL_OPERATIONS_TOTAL
        .with_label_values(&["adopt"])
        .inc();
}

pub fn increment_agent_pools_deleted() {
    AGENT_POOL_OPERATIONS_TOTAL
        .with_label_values(&["delete"])
        .inc();
}

pub fn increment_drift_detected() {
    DRIFT_DETECTED_TOTAL.inc();
}

pub fn increment_agent_tokens_created() {
    AGENT_TOKENS_CREATED_TOTAL.inc();
}

pub fn increment_agent_tokens_revoked() {
    AGENT_TOKENS_REVOKED_TOTAL.inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
