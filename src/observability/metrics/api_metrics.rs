//! # API Metrics
//!
//! Terraform Cloud API request counts and latency, labelled by outcome.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec};
use std::sync::LazyLock;

static API_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tfc_agent_pool_api_requests_total",
            "Total number of Terraform Cloud API requests",
        ),
        &["outcome"],
    )
    .expect("Failed to create API_REQUESTS_TOTAL metric - this should never happen")
});

static API_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "tfc_agent_pool_api_request_duration_seconds",
            "Duration of Terraform Cloud API requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["outcome"],
    )
    .expect("Failed to create API_REQUEST_DURATION metric - this should never happen")
});

pub(crate) fn register_api_metrics() -> Result<()> {
    REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUEST_DURATION.clone()))?;
    Ok(())
}

/// Record one API request; `outcome` is one of success, not_found, transient, rejected
pub fn observe_api_request(outcome: &str, duration: f64) {
    API_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    API_REQUEST_DURATION
        .with_label_values(&[outcome])
        .observe(duration);
}
