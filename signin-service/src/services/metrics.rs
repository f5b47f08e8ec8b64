use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Metrics
pub static SIGNIN_FLOW_OUTCOMES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Register collectors. Safe to call more than once; later calls are no-ops.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let flow_outcomes = IntCounterVec::new(
        Opts::new(
            "signin_flow_outcomes_total",
            "Sign-in flow invocations by flow and outcome",
        ),
        &["flow", "outcome"],
    )?;

    registry.register(Box::new(flow_outcomes.clone()))?;

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = SIGNIN_FLOW_OUTCOMES_TOTAL.set(flow_outcomes);
    Ok(())
}

/// Count one flow invocation. `outcome` is "ok" or an error code.
pub fn record_flow_outcome(flow: &str, outcome: &str) {
    if let Some(counter) = SIGNIN_FLOW_OUTCOMES_TOTAL.get() {
        counter.with_label_values(&[flow, outcome]).inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}
