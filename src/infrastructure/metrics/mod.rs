//! Prometheus Metrics Module
//!
//! Application-wide metrics collection.
//!
//! # Metrics Collected
//! - Active gateway connection gauge
//! - Messages delivered, by kind (chat/private)
//! - Handshake outcomes (accepted/rejected/timeout)

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active gateway connections
pub static GATEWAY_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "gateway_connections_active",
            "Number of active gateway connections",
        )
        .namespace("parley"),
    )
    .expect("Failed to create GATEWAY_CONNECTIONS_ACTIVE metric")
});

/// Messages persisted and fanned out, by kind
pub static MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_total", "Total messages processed").namespace("parley"),
        &["kind"], // "chat", "private"
    )
    .expect("Failed to create MESSAGES_TOTAL metric")
});

/// Handshake outcomes, by result
pub static HANDSHAKES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("handshakes_total", "Gateway identify handshake outcomes")
            .namespace("parley"),
        &["outcome"], // "accepted", "rejected", "timeout"
    )
    .expect("Failed to create HANDSHAKES_TOTAL metric")
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(GATEWAY_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register GATEWAY_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(MESSAGES_TOTAL.clone()))
        .expect("Failed to register MESSAGES_TOTAL");
    registry
        .register(Box::new(HANDSHAKES_TOTAL.clone()))
        .expect("Failed to register HANDSHAKES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a processed message
pub fn record_message(kind: &str) {
    MESSAGES_TOTAL.with_label_values(&[kind]).inc();
}

/// Record an identify handshake outcome
pub fn record_handshake(outcome: &str) {
    HANDSHAKES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Update the active connection gauge
pub fn set_active_connections(count: i64) {
    GATEWAY_CONNECTIONS_ACTIVE.set(count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = &*REGISTRY;
        let _ = &*GATEWAY_CONNECTIONS_ACTIVE;
        let _ = &*MESSAGES_TOTAL;
        let _ = &*HANDSHAKES_TOTAL;
    }

    #[test]
    fn test_gather_metrics() {
        record_message("chat");
        let metrics = gather_metrics();
        assert!(metrics.contains("parley_messages_total"));
    }
}
