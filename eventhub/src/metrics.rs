//! Prometheus metrics for the event registration service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `seatledger_registrations_total{outcome}` - Register attempts by outcome
//! - `seatledger_cancellations_total` - Successful cancellations
//! - `seatledger_feedback_total{outcome}` - Feedback created or updated
//! - `seatledger_reminders_sent_total` - Reminder notifications dispatched
//! - `seatledger_notifications_total{kind, outcome}` - Email function calls
//! - `seatledger_store_errors_total{operation}` - Failed database operations
//! - `seatledger_feed_reconnects_total` - Change feed listener reconnects
//! - `seatledger_http_responses_total{method, status}` - Responses by status code
//!
//! ## Histograms
//! - `seatledger_http_request_duration_seconds{method}` - Request latency
//!
//! ## Gauges
//! - `seatledger_available_seats{event_id}` - Last observed free seats per event
//! - `seatledger_ws_connections` - Open change feed websockets

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Register all metric descriptions.
///
/// Call once at startup, after the exporter is installed.
pub fn register_metrics() {
    describe_counter!(
        "seatledger_registrations_total",
        "Register attempts by outcome (confirmed, sold_out, already_registered, ...)"
    );
    describe_counter!(
        "seatledger_cancellations_total",
        "Registrations cancelled by their owner"
    );
    describe_counter!(
        "seatledger_feedback_total",
        "Feedback submissions by outcome (created, updated)"
    );
    describe_counter!(
        "seatledger_reminders_sent_total",
        "Reminder notifications dispatched"
    );
    describe_counter!(
        "seatledger_notifications_total",
        "Email function calls by kind and outcome"
    );
    describe_counter!(
        "seatledger_store_errors_total",
        "Database operations that failed"
    );
    describe_counter!(
        "seatledger_feed_reconnects_total",
        "Times the change feed listener lost its connection"
    );
    describe_counter!(
        "seatledger_http_responses_total",
        "HTTP responses by method and status code"
    );
    describe_histogram!(
        "seatledger_http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    describe_gauge!(
        "seatledger_available_seats",
        "Free seats per event as of the last ledger operation"
    );
    describe_gauge!(
        "seatledger_ws_connections",
        "Open change feed websocket connections"
    );

    tracing::info!("Metrics registered");
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`BuildError`] if a recorder is already installed or the
/// listener cannot be started.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}
